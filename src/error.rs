use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A fail-fast read noticed the sequence changing underneath it.
    #[error(
        "sequence was modified while being read (modification count {expected} became {found})"
    )]
    ConcurrentModification { expected: u64, found: u64 },

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("worker pool has been shut down")]
    PoolClosed,

    #[error("failed to install the ctrl-c handler: {0}")]
    Signal(#[from] ctrlc::Error),
}
