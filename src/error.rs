use thiserror::Error;

#[derive(Error, Debug)]
pub enum LensError {
    #[error("CSV is missing required columns: {}", .0.join(", "))]
    Schema(Vec<String>),

    #[error("Invalid data: {0}")]
    Data(String),

    #[error("Model not loaded: {0}")]
    ServiceUnavailable(String),

    #[error("An error occurred during processing: {0}")]
    Unexpected(String),

    #[error("Invalid model artifact: {0}")]
    Model(String),

    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl LensError {
    /// Errors caused by the caller's input, as opposed to server-side failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Schema(_) | Self::Data(_) | Self::InvalidFileType(_) | Self::Csv(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LensError>;
