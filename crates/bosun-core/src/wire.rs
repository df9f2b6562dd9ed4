use thiserror::Error;

/// Wire protocol version expected by current binaries.
pub const PROTOCOL_VERSION: u32 = 1;

/// Marker bytes delimiting envelope sections.
///
/// Both peers must agree on these values. A mismatch at any position means
/// sender and receiver disagree about envelope layout, and decoding fails
/// immediately instead of misreading subsequent bytes.
pub mod marker {
    /// Introduces the operation section of a request envelope.
    pub const OPERATION: u8 = 0x45;
    /// Introduces the body section of an envelope.
    pub const BODY_START: u8 = 0x46;
    /// Precedes the opaque payload bytes.
    pub const BODY: u8 = 0x47;
    /// Terminates an envelope.
    pub const END: u8 = 0x48;
}

/// Outcome byte carried in the body section of a response envelope.
///
/// Occupies the slot the operation code holds in the request leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseCode {
    /// Handler completed; payload is the operation's response body.
    Success = 0x00,
    /// No handler registered; payload is the offending operation code byte.
    UnknownOperation = 0x01,
    /// Handler failed; payload is a UTF-8 error message.
    HandlerFailure = 0x02,
}

/// Error for a response code byte outside the defined set.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unknown response code byte 0x{0:02x}")]
pub struct UnknownResponseCode(pub u8);

impl ResponseCode {
    /// Parses the wire byte into a response code.
    pub fn from_u8(value: u8) -> Result<Self, UnknownResponseCode> {
        match value {
            0x00 => Ok(Self::Success),
            0x01 => Ok(Self::UnknownOperation),
            0x02 => Ok(Self::HandlerFailure),
            other => Err(UnknownResponseCode(other)),
        }
    }

    /// Returns the byte written on the wire for this code.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
