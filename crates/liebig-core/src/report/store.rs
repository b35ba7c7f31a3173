use super::Report;
use crate::error::LiebigError;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Persistence collaborator for finished reports.
pub trait ReportStore {
    /// Persist `report` under a fresh key and return it. Never replaces a
    /// stored report.
    fn save(&self, report: &Report) -> Result<String, LiebigError>;

    fn load(&self, key: &str) -> Result<Report, LiebigError>;

    /// Rewrite the report already stored under `key`.
    fn replace(&self, key: &str, report: &Report) -> Result<(), LiebigError>;

    /// Flag a stored report as applied in the field.
    fn mark_applied(&self, key: &str) -> Result<Report, LiebigError> {
        let mut report = self.load(key)?;
        report.mark_applied();
        self.replace(key, &report)?;
        Ok(report)
    }
}

/// One pretty-printed JSON file per report inside a directory.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, LiebigError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    // Write beside the target so readers never see a partial file.
    fn staged(&self, report: &Report) -> Result<tempfile::NamedTempFile, LiebigError> {
        let body = serde_json::to_vec_pretty(report)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&body)?;
        tmp.as_file().sync_all()?;
        Ok(tmp)
    }
}

/// Upper bound on `-N` suffixes tried for one base key.
const MAX_KEY_SUFFIX: u32 = 10_000;

impl ReportStore for JsonDirStore {
    fn save(&self, report: &Report) -> Result<String, LiebigError> {
        let base = report.key();
        let mut tmp = self.staged(report)?;

        for n in 1..=MAX_KEY_SUFFIX {
            let key = if n == 1 {
                base.clone()
            } else {
                format!("{base}-{n}")
            };
            match tmp.persist_noclobber(self.path_for(&key)) {
                Ok(_) => {
                    log::info!("stored report {key} in {}", self.dir.display());
                    return Ok(key);
                }
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    log::debug!("report key {key} taken");
                    tmp = e.file;
                }
                Err(e) => return Err(LiebigError::Store(e.to_string())),
            }
        }
        Err(LiebigError::Store(format!(
            "no free key for report {base} in {}",
            self.dir.display()
        )))
    }

    fn replace(&self, key: &str, report: &Report) -> Result<(), LiebigError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Err(LiebigError::ReportNotFound(key.to_string()));
        }
        self.staged(report)?
            .persist(&path)
            .map_err(|e| LiebigError::Store(e.to_string()))?;
        log::info!("updated report {key} in {}", self.dir.display());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Report, LiebigError> {
        let path = self.path_for(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LiebigError::ReportNotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }
}
