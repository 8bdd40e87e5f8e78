use thiserror::Error;

/// Wire bytes that do not form a valid frame record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty message")]
    Empty,

    #[error("offset {offset} + {len} bytes exceeds message of {size} bytes")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    #[error("malformed vtable: {0}")]
    InvalidVTable(&'static str),

    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    #[error("field `{field}` is invalid: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

/// Declared frame dimensions that disagree with the payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("expected {expected} samples but payload holds {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Caller contract violations on the ring buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingBufferError {
    #[error("ring buffer needs at least one channel and one sample (got {channels} x {capacity})")]
    InvalidDimensions { channels: usize, capacity: usize },

    #[error("write of {requested} samples exceeds ring capacity {capacity}")]
    ExceedsCapacity { requested: usize, capacity: usize },

    #[error("matrix has {available} channels, ring retains {required}")]
    MissingChannels { required: usize, available: usize },

    #[error("write of {requested} samples but matrix holds {available} per channel")]
    ShortMatrix { requested: usize, available: usize },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("socket error: {0}")]
    Socket(String),
}

/// Errors that end the ingestion loop
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("ring buffer rejected write: {0}")]
    Buffer(#[from] RingBufferError),
}
