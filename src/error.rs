use thiserror::Error;

/// Everything that can end a scoring request early.
///
/// None of these are retried by the engine; the caller decides whether to resubmit.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or malformed session input.
    #[error("invalid session: {0}")]
    Validation(String),

    /// A referenced user or session does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage layer failed, or the aggregate changed underneath us.
    #[error("storage failure: {0}")]
    Persistence(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        log::error!("[storage] {err}");
        EngineError::Persistence(err.to_string())
    }
}

impl EngineError {
    /// The message a user is allowed to see. Storage details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Persistence(_) => String::from("Oops, internal error."),
            other => other.to_string(),
        }
    }
}
