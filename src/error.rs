use std::fmt;

#[derive(Debug)]
pub enum PullError {
    /// Missing or invalid environment-supplied settings or credentials.
    Configuration(String),
    /// Auth, network, quota or decoding failure talking to the Data API.
    SourceQuery(String),
    /// Failure creating the output directory or writing the summary.
    Io(String)
}

impl fmt::Display for PullError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PullError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            PullError::SourceQuery(msg) => write!(f, "Source query error: {}", msg),
            PullError::Io(msg) => write!(f, "I/O error: {}", msg)
        }
    }
}

impl std::error::Error for PullError {}

impl From<serde_json::Error> for PullError {
    fn from(err: serde_json::Error) -> PullError {
        PullError::SourceQuery(format!("JSON parsing error: {}", err))
    }
}

impl From<reqwest::Error> for PullError {
    fn from(err: reqwest::Error) -> PullError {
        PullError::SourceQuery(format!("HTTP error: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for PullError {
    fn from(err: jsonwebtoken::errors::Error) -> PullError {
        PullError::SourceQuery(format!("token signing error: {}", err))
    }
}

impl From<std::io::Error> for PullError {
    fn from(err: std::io::Error) -> PullError {
        PullError::Io(err.to_string())
    }
}
