use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("invalid source address: {0}")]
    InvalidSourceAddress(String),
    #[error("failed to fetch recon resource {resource}: {source}")]
    Fetch {
        resource: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode recon resource {resource}: {source}")]
    Decode {
        resource: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
