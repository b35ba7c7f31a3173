use liebig_core::catalog::products::load_product_defs;
use liebig_core::error::LiebigError;
use liebig_core::report::request::load_request;
use liebig_core::report::store::{JsonDirStore, ReportStore};
use liebig_core::{generate_and_store, generate_report, SamplePolicy};
use std::path::{Path, PathBuf};

use super::catalog_from;
use crate::output;

pub struct Args {
    pub request: PathBuf,
    pub products: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub policy: Option<String>,
    pub relaxed: bool,
    pub output: String,
    pub store: Option<PathBuf>,
    pub trace: bool,
}

pub fn run(args: Args) -> Result<(), LiebigError> {
    let catalog = catalog_from(args.catalog.as_deref())?;
    let mut request = load_request(&args.request)?;

    if let Some(path) = &args.products {
        request.products = load_product_defs(path)?;
    }
    match args.policy.as_deref() {
        Some("most-recent") => request.policy = SamplePolicy::MostRecent,
        Some("average") => request.policy = SamplePolicy::Average,
        Some(_) => request.policy = SamplePolicy::First,
        None => {}
    }
    if args.relaxed {
        request.allow_relaxed = true;
    }

    let report = match &args.store {
        Some(dir) => {
            let store = JsonDirStore::new(dir)?;
            let (key, report) = generate_and_store(&request, &catalog, &store)?;
            eprintln!("Saved report '{key}' in {}", store.dir().display());
            report
        }
        None => generate_report(&request, &catalog)?,
    };

    match args.output.as_str() {
        "json" => output::json::print(&report)?,
        _ => output::text::print_report(&report, args.trace),
    }
    Ok(())
}

pub fn mark_applied(key: &str, dir: &Path) -> Result<(), LiebigError> {
    let store = JsonDirStore::new(dir)?;
    let report = store.mark_applied(key)?;
    println!(
        "Report '{}' for plot {} marked as applied.",
        key, report.plot_id
    );
    Ok(())
}
