use thiserror::Error;

/// Errors raised by the connection registry and during fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// Subscribing would exceed the configured viewer limit.
    #[error("Registry full: {max} viewers already connected")]
    RegistryFull { max: usize },

    /// The viewer's outbox is gone; its connection task has exited.
    #[error("Connection closed")]
    Closed,

    /// The viewer did not accept the frame within its delivery budget.
    #[error("Delivery timed out after {ms}ms")]
    Timeout { ms: u64 },
}

impl BroadcastError {
    /// Short error code string sent to clients in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            BroadcastError::RegistryFull { .. } => "REGISTRY_FULL",
            BroadcastError::Closed => "CONNECTION_CLOSED",
            BroadcastError::Timeout { .. } => "DELIVERY_TIMEOUT",
        }
    }
}
