use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid version {version:?} of API {api}: {reason}")]
    InvalidVersion {
        api: String,
        version: String,
        reason: String,
    },

    #[error("API not found: {0}")]
    ApiNotFound(String),

    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}
