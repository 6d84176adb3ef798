use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("search failed: {0}")]
    Search(String),
    #[error("failed to fetch page {page}: {reason}")]
    PageFetch { page: usize, reason: String },
    #[error("failed to fetch content from {url}: {reason}")]
    ContentFetch { url: String, reason: String },
    #[error("invalid catalog: {0}")]
    Catalog(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("other error: {0}")]
    Other(String),
}
