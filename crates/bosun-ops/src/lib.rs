//! Built-in fabric operations shared by the bosun daemon and CLI.
//!
//! Each operation pairs a CBOR request payload with its typed reply and an
//! allocated operation code. The protocol core stays oblivious to all of
//! this; it only moves opaque body bytes.

use bosun_core::OperationCode;
use bosun_proto::{Operation, ProtoError, body};
use serde::{Deserialize, Serialize};

/// Operation codes allocated to the built-in fabric set.
///
/// Code 0x00 and the 0xF0..=0xFF range are reserved for future fabric use.
pub mod codes {
    use bosun_core::OperationCode;

    /// Liveness probe.
    pub const PING: OperationCode = OperationCode(0x01);
    /// Daemon build and uptime metadata.
    pub const SERVER_INFO: OperationCode = OperationCode(0x02);
    /// Returns the request message unchanged.
    pub const ECHO: OperationCode = OperationCode(0x03);
}

/// Liveness probe carrying a caller-chosen nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping {
    /// Nonce the daemon must copy into its reply.
    pub nonce: u64,
}

/// Ping acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    /// Nonce copied from the probe.
    pub nonce: u64,
}

impl Operation for Ping {
    type Response = Pong;

    fn code(&self) -> OperationCode {
        codes::PING
    }

    fn write_request(&self, out: &mut Vec<u8>) -> Result<(), ProtoError> {
        body::encode_into(self, out)
    }

    fn read_response(&self, body: &[u8]) -> Result<Pong, ProtoError> {
        body::decode(body)
    }
}

/// Requests daemon build and uptime metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerInfoRequest {}

/// Daemon metadata reported by the server-info operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Daemon version string.
    pub daemon: String,
    /// Wire protocol version.
    pub protocol: u32,
    /// Milliseconds since the daemon started.
    pub uptime_ms: u64,
    /// Requests served since startup.
    pub served_requests: u64,
}

impl Operation for ServerInfoRequest {
    type Response = ServerInfo;

    fn code(&self) -> OperationCode {
        codes::SERVER_INFO
    }

    fn write_request(&self, out: &mut Vec<u8>) -> Result<(), ProtoError> {
        body::encode_into(self, out)
    }

    fn read_response(&self, body: &[u8]) -> Result<ServerInfo, ProtoError> {
        body::decode(body)
    }
}

/// Round-trips a message through the daemon unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    /// Message to send back verbatim.
    pub message: String,
}

/// Echo reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoReply {
    /// Message copied from the request.
    pub message: String,
}

impl Operation for Echo {
    type Response = EchoReply;

    fn code(&self) -> OperationCode {
        codes::ECHO
    }

    fn write_request(&self, out: &mut Vec<u8>) -> Result<(), ProtoError> {
        body::encode_into(self, out)
    }

    fn read_response(&self, body: &[u8]) -> Result<EchoReply, ProtoError> {
        body::decode(body)
    }
}

#[cfg(test)]
mod tests {
    use bosun_proto::{Operation, body};

    use super::{Echo, EchoReply, Ping, codes};

    #[test]
    fn ping_body_roundtrip() {
        let ping = Ping { nonce: 7 };

        let mut request = Vec::new();
        ping.write_request(&mut request).expect("encode request");
        let decoded: Ping = body::decode(&request).expect("decode request");
        assert_eq!(decoded, ping);
    }

    #[test]
    fn echo_reply_decodes_through_operation() {
        let op = Echo {
            message: "fabric".to_string(),
        };
        assert_eq!(op.code(), codes::ECHO);

        let reply = body::encode(&EchoReply {
            message: "fabric".to_string(),
        })
        .expect("encode reply");

        let decoded = op.read_response(&reply).expect("decode reply");
        assert_eq!(decoded.message, "fabric");
    }
}
