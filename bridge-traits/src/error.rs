use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The host rejected an argument (malformed URI, out-of-range volume, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The native handle was already released by the host.
    #[error("Handle released: {0}")]
    Released(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
