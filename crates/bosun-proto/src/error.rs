use thiserror::Error;

/// Transport, framing, and correlation failures for management requests.
///
/// The only propagation path toward a caller is the failed state of a
/// completion; none of these terminate the channel's receive task except
/// transport-level frame I/O errors.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Underlying channel I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Frame size exceeded maximum allowed payload.
    #[error("frame too large: {size} > {max}")]
    FrameTooLarge { size: u32, max: u32 },
    /// Marker byte mismatch or truncated envelope.
    #[error("malformed envelope: {detail}")]
    MalformedEnvelope { detail: String },
    /// Envelope header carried an unexpected protocol version.
    #[error("protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u32, actual: u32 },
    /// Body encoding failed.
    #[error("failed to encode body: {0}")]
    Encode(String),
    /// Body decoding failed.
    #[error("failed to decode body: {0}")]
    Decode(String),
    /// Remote peer had no handler for the operation code.
    #[error("no handler registered for operation 0x{code:02x}")]
    UnknownOperation { code: u8 },
    /// Remote handler failed while serving the request.
    #[error("remote handler failed: {message}")]
    HandlerFailure { message: String },
    /// Channel tore down while the request was pending.
    #[error("channel closed")]
    ChannelClosed,
    /// The dispatch executor no longer accepts work.
    #[error("executor stopped")]
    ExecutorStopped,
}

impl ProtoError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            detail: detail.into(),
        }
    }
}

/// Failure raised by an operation handler, reported back to the requester
/// as a failed response rather than a dropped connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    /// Failure detail carried in the response payload.
    pub message: String,
}

impl HandlerError {
    /// Creates a handler failure with the given detail message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ProtoError> for HandlerError {
    fn from(err: ProtoError) -> Self {
        Self::new(err.to_string())
    }
}
