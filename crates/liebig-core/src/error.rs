use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LiebigError {
    #[error("failed to load catalog from {path}: {reason}")]
    CatalogLoad { path: PathBuf, reason: String },

    #[error("invalid catalog: {0}")]
    CatalogInvalid(String),

    #[error("failed to load products from {path}: {reason}")]
    ProductsLoad { path: PathBuf, reason: String },

    #[error("invalid product list: {0}")]
    ProductsInvalid(String),

    #[error("failed to load request from {path}: {reason}")]
    RequestLoad { path: PathBuf, reason: String },

    #[error("analysis batch is empty")]
    EmptyBatch,

    #[error("analysis batch mixes plots '{expected}' and '{found}'")]
    MixedPlots { expected: String, found: String },

    #[error("objective for crop '{crop}' has no recognized nutrient targets")]
    EmptyObjective { crop: String },

    #[error("no nutrient demands given")]
    NoDemands,

    #[error("report store error: {0}")]
    Store(String),

    #[error("report '{0}' not found in store")]
    ReportNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
