use thiserror::Error;

/// Failure reported by a single event handler.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// One failed handler invocation within a publish.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub handler: &'static str,
    pub error: String,
}

/// One or more handlers failed during a publish.
///
/// Handlers that succeeded have already run and are not rolled back; the
/// relay reacts by leaving the record undelivered, so those handlers will
/// see the event again on the retry. Consumers must be idempotent.
#[derive(Debug, Clone)]
pub struct PublishError {
    pub failures: Vec<HandlerFailure>,
}

impl std::error::Error for PublishError {}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} handler(s) failed:", self.failures.len())?;
        for failure in &self.failures {
            write!(f, " {}: {};", failure.handler, failure.error)?;
        }
        Ok(())
    }
}
