use thiserror::Error;

/// Errors raised by host bridge implementations.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Connection, DNS, TLS or timeout failure before a response was received.
    #[error("Network error: {0}")]
    Network(String),

    /// The remote catalog answered with a document the collaborator could not decode.
    #[error("Malformed catalog response: {0}")]
    MalformedResponse(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the failure happened on the wire rather than in local state.
    pub fn is_network(&self) -> bool {
        matches!(self, BridgeError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
