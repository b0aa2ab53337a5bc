use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Network unavailable")]
    Offline,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the error came from the remote side rather than local storage.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AppError::Http(_) | AppError::Api { .. } | AppError::NotSignedIn | AppError::Offline
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_includes_status() {
        let err = AppError::Api {
            status: 404,
            message: "Show not found".to_string(),
        };
        assert_eq!(err.to_string(), "API error (404): Show not found");
        assert!(err.is_remote());
    }

    #[test]
    fn local_errors_are_not_remote() {
        let err = AppError::Validation("Rating must be between 1 and 5".to_string());
        assert!(!err.is_remote());
        assert_eq!(err.to_string(), "Rating must be between 1 and 5");
    }
}
