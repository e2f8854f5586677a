use thiserror::Error;

use crate::protocol::ProtocolError;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("I/O error talking to invoker: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The sandbox behind a slot is no longer running. Carries its output.
    #[error("invoker {id}:{port} failed")]
    FailedSandbox { id: String, port: u16, logs: String },

    #[error("no live invoker slots left")]
    NoLiveSlots,

    #[error("no invoker configured on port {0}")]
    UnknownSlot(u16),

    #[error("invoker handle already used for a request")]
    HandleReused,

    #[error("invalid invoker configuration: {0}")]
    Config(String),
}
