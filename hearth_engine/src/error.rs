use thiserror::Error;

/// Failure propagated from the host boundary. Recorded but non-fatal to the
/// remaining commands of a block.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("host error in {operation}: {message}")]
pub struct HostError {
    pub operation: String,
    pub message: String,
}
impl HostError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Evaluation failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    /// Unresolved variable reference. Fatal to the evaluating block.
    #[error("unresolved variable {0}")]
    Scope(String),
    /// Incompatible operand types; the engine never silently coerces.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// Bad configuration, e.g. an area-shortcut cycle or an unknown name.
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Host(#[from] HostError),
}
