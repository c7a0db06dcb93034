use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A report schedule failed validation before it was armed.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// A raw usage payload could not be interpreted. The prior aggregate
    /// state is kept unchanged when this is raised.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("invalid time value: {0}")]
    InvalidTime(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// The report could not be handed to the OS mail composer. Prior
    /// schedule state is left untouched.
    #[error("report delivery failed: {0}")]
    Delivery(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
