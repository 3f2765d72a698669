use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Backend error (what={what}, extra={extra}): {message}")]
    Backend {
        what: i32,
        extra: i32,
        message: String,
    },

    #[error("Unknown view or container: {0}")]
    UnknownNode(String),
}

impl BridgeError {
    /// Diagnostic codes carried by a backend failure, if any.
    pub fn codes(&self) -> Option<(i32, i32)> {
        match self {
            BridgeError::Backend { what, extra, .. } => Some((*what, *extra)),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
