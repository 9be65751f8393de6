use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FuelError {
    #[error("Failed to fetch prices: {0}")]
    Fetch(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("No price data")]
    EmptyData,

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("log directory is locked by another run: {0}")]
    Locked(PathBuf),

    #[error("Failed to notify: {0}")]
    Notify(String),

    #[error("invalid date {0}")]
    InvalidDate(String),
}

impl FuelError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FuelError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        FuelError::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for FuelError {
    fn from(err: reqwest::Error) -> Self {
        FuelError::Fetch(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FuelError>;
