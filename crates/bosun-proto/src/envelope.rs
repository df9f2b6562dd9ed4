use bosun_core::{OperationCode, PROTOCOL_VERSION, RequestId, ResponseCode, marker};

use crate::ProtoError;

/// Fixed header written once per request and once per response.
///
/// The response header reuses the request's identifier verbatim so the two
/// legs correlate on the shared channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// Wire protocol version.
    pub version: u32,
    /// Correlation identifier for this request/response pair.
    pub request_id: RequestId,
}

impl EnvelopeHeader {
    /// Creates a header for the current protocol version.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            request_id,
        }
    }
}

/// One decoded envelope, with the payload borrowed from the frame buffer.
///
/// The marker byte following the header discriminates the legs: a request
/// carries an operation section, a response starts its body directly.
#[derive(Debug, PartialEq, Eq)]
pub enum Envelope<'a> {
    /// Request leg: operation code plus opaque request body.
    Request {
        header: EnvelopeHeader,
        code: OperationCode,
        body: &'a [u8],
    },
    /// Response leg: outcome code plus opaque response body.
    Response {
        header: EnvelopeHeader,
        code: ResponseCode,
        body: &'a [u8],
    },
}

/// Encodes a request envelope, delegating the payload to `write_body`.
///
/// The codec does not interpret the payload; the caller-supplied writer
/// appends whatever bytes the selected operation defines.
pub fn encode_request<F>(
    header: EnvelopeHeader,
    code: OperationCode,
    write_body: F,
) -> Result<Vec<u8>, ProtoError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), ProtoError>,
{
    let mut out = Vec::with_capacity(32);
    put_header(&mut out, header);
    out.push(marker::OPERATION);
    out.push(code.0);
    out.push(marker::BODY_START);
    out.push(marker::BODY);
    write_body(&mut out)?;
    out.push(marker::END);
    Ok(out)
}

/// Encodes a response envelope tagged with the request's identifier.
pub fn encode_response(header: EnvelopeHeader, code: ResponseCode, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + body.len());
    put_header(&mut out, header);
    out.push(marker::BODY_START);
    out.push(code.as_u8());
    out.push(marker::BODY);
    out.extend_from_slice(body);
    out.push(marker::END);
    out
}

/// Decodes one envelope from a complete frame.
///
/// Any marker byte that does not match its expected value, or a frame that
/// ends before the terminating marker, fails with `MalformedEnvelope`. The
/// strict marker sequence surfaces sender/receiver layout disagreement at
/// the first mismatched byte.
pub fn decode(frame: &[u8]) -> Result<Envelope<'_>, ProtoError> {
    let mut reader = FrameReader::new(frame);

    let version = reader.take_u32("version")?;
    if version != PROTOCOL_VERSION {
        return Err(ProtoError::VersionMismatch {
            expected: PROTOCOL_VERSION,
            actual: version,
        });
    }
    let request_id = RequestId(reader.take_u64("request id")?);
    let header = EnvelopeHeader {
        version,
        request_id,
    };

    match reader.take_u8("section marker")? {
        marker::OPERATION => {
            let code = OperationCode(reader.take_u8("operation code")?);
            reader.expect_marker(marker::BODY_START, "body start marker")?;
            reader.expect_marker(marker::BODY, "body marker")?;
            let body = reader.payload_until_end()?;
            Ok(Envelope::Request { header, code, body })
        }
        marker::BODY_START => {
            let byte = reader.take_u8("response code")?;
            let code =
                ResponseCode::from_u8(byte).map_err(|err| ProtoError::malformed(err.to_string()))?;
            reader.expect_marker(marker::BODY, "body marker")?;
            let body = reader.payload_until_end()?;
            Ok(Envelope::Response { header, code, body })
        }
        other => Err(ProtoError::malformed(format!(
            "unexpected section marker 0x{other:02x}"
        ))),
    }
}

fn put_header(out: &mut Vec<u8>, header: EnvelopeHeader) {
    out.extend_from_slice(&header.version.to_be_bytes());
    out.extend_from_slice(&header.request_id.0.to_be_bytes());
}

/// Cursor over a frame that reports truncation and marker mismatches.
struct FrameReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take_u8(&mut self, field: &str) -> Result<u8, ProtoError> {
        let byte = self
            .bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| ProtoError::malformed(format!("truncated before {field}")))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take_u32(&mut self, field: &str) -> Result<u32, ProtoError> {
        Ok(u32::from_be_bytes(self.take_array(field)?))
    }

    fn take_u64(&mut self, field: &str) -> Result<u64, ProtoError> {
        Ok(u64::from_be_bytes(self.take_array(field)?))
    }

    fn take_array<const N: usize>(&mut self, field: &str) -> Result<[u8; N], ProtoError> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| ProtoError::malformed(format!("truncated before {field}")))?;
        self.pos = end;
        let mut array = [0_u8; N];
        array.copy_from_slice(slice);
        Ok(array)
    }

    fn expect_marker(&mut self, expected: u8, name: &str) -> Result<(), ProtoError> {
        let actual = self.take_u8(name)?;
        if actual != expected {
            return Err(ProtoError::malformed(format!(
                "{name}: expected 0x{expected:02x}, got 0x{actual:02x}"
            )));
        }
        Ok(())
    }

    /// Returns the remaining bytes minus the terminating end marker.
    fn payload_until_end(self) -> Result<&'a [u8], ProtoError> {
        let Some((last, payload)) = self.bytes[self.pos..].split_last() else {
            return Err(ProtoError::malformed("truncated before end marker"));
        };
        if *last != marker::END {
            return Err(ProtoError::malformed(format!(
                "end marker: expected 0x{:02x}, got 0x{last:02x}",
                marker::END
            )));
        }
        Ok(payload)
    }
}
