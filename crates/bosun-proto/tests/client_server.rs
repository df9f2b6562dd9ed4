use std::sync::Arc;

use async_trait::async_trait;
use bosun_core::{OperationCode, RequestId, ResponseCode};
use bosun_proto::{
    ChannelPeer, CompletionState, HandlerError, HandlerRegistry, Operation, OperationHandler,
    ProtoError, WorkerPool,
    envelope::{self, Envelope, EnvelopeHeader},
    framing,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{UnixListener, UnixStream},
    runtime::Handle,
    time::{Duration, sleep},
};

const DOUBLE: OperationCode = OperationCode(102);

/// Sends a 4-byte integer; expects the peer to send back its double.
struct DoubleOp {
    value: u32,
}

impl Operation for DoubleOp {
    type Response = u32;

    fn code(&self) -> OperationCode {
        DOUBLE
    }

    fn write_request(&self, body: &mut Vec<u8>) -> Result<(), ProtoError> {
        body.extend_from_slice(&self.value.to_be_bytes());
        Ok(())
    }

    fn read_response(&self, body: &[u8]) -> Result<u32, ProtoError> {
        let bytes: [u8; 4] = body
            .try_into()
            .map_err(|_| ProtoError::Decode("expected 4-byte integer".to_string()))?;
        Ok(u32::from_be_bytes(bytes))
    }
}

struct DoublingHandler;

#[async_trait]
impl OperationHandler for DoublingHandler {
    async fn handle(&self, request: &[u8]) -> Result<Vec<u8>, HandlerError> {
        let bytes: [u8; 4] = request
            .try_into()
            .map_err(|_| HandlerError::new("expected 4-byte integer"))?;
        let value = u32::from_be_bytes(bytes);
        Ok(value.wrapping_mul(2).to_be_bytes().to_vec())
    }
}

struct FailingHandler;

#[async_trait]
impl OperationHandler for FailingHandler {
    async fn handle(&self, _request: &[u8]) -> Result<Vec<u8>, HandlerError> {
        Err(HandlerError::new("content repository unavailable"))
    }
}

fn server_handlers() -> Arc<HandlerRegistry> {
    let handlers = HandlerRegistry::new();
    handlers.register(DOUBLE, Arc::new(DoublingHandler));
    handlers.register(OperationCode(103), Arc::new(FailingHandler));
    Arc::new(handlers)
}

fn connected_pair() -> (Arc<ChannelPeer>, Arc<ChannelPeer>) {
    let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
    let client = ChannelPeer::start(client_stream, Arc::new(HandlerRegistry::new()));
    let server = ChannelPeer::start(server_stream, server_handlers());
    (client, server)
}

/// Reads one request frame from a raw stream half, for hand-crafted replies.
async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> (RequestId, OperationCode, Vec<u8>) {
    let frame = framing::read_frame(reader).await.expect("request frame");
    match envelope::decode(&frame).expect("request envelope") {
        Envelope::Request { header, code, body } => (header.request_id, code, body.to_vec()),
        other => panic!("unexpected envelope: {other:?}"),
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    id: RequestId,
    code: ResponseCode,
    body: &[u8],
) {
    let frame = envelope::encode_response(EnvelopeHeader::new(id), code, body);
    framing::write_frame(writer, &frame)
        .await
        .expect("response frame");
}

#[tokio::test]
async fn doubling_roundtrip() {
    let (client, _server) = connected_pair();
    let executor = Handle::current();

    let completion = client.submit(&executor, DoubleOp { value: 21 });
    let doubled = completion.wait().await.expect("response should arrive");

    assert_eq!(doubled, 42);
    assert_eq!(client.registry().pending_len(), 0);
}

#[tokio::test]
async fn concurrent_requests_all_resolve() {
    let (client, _server) = connected_pair();
    let pool = Arc::new(WorkerPool::new(4));

    let completions: Vec<_> = (0..24_u32)
        .map(|value| (value, client.submit(pool.as_ref(), DoubleOp { value })))
        .collect();

    for (value, completion) in completions {
        let doubled = completion.wait().await.expect("response should arrive");
        assert_eq!(doubled, value * 2);
    }
    assert_eq!(client.registry().pending_len(), 0);
}

#[tokio::test]
async fn unknown_operation_fails_completion() {
    struct Unregistered;

    impl Operation for Unregistered {
        type Response = ();

        fn code(&self) -> OperationCode {
            OperationCode(200)
        }

        fn write_request(&self, _body: &mut Vec<u8>) -> Result<(), ProtoError> {
            Ok(())
        }

        fn read_response(&self, _body: &[u8]) -> Result<(), ProtoError> {
            Ok(())
        }
    }

    let (client, _server) = connected_pair();
    let executor = Handle::current();

    match client.submit(&executor, Unregistered).wait().await {
        Err(ProtoError::UnknownOperation { code: 200 }) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(client.registry().pending_len(), 0);
}

#[tokio::test]
async fn handler_failure_is_reported_back() {
    struct Failing;

    impl Operation for Failing {
        type Response = ();

        fn code(&self) -> OperationCode {
            OperationCode(103)
        }

        fn write_request(&self, _body: &mut Vec<u8>) -> Result<(), ProtoError> {
            Ok(())
        }

        fn read_response(&self, _body: &[u8]) -> Result<(), ProtoError> {
            Ok(())
        }
    }

    let (client, _server) = connected_pair();
    let executor = Handle::current();

    match client.submit(&executor, Failing).wait().await {
        Err(ProtoError::HandlerFailure { message }) => {
            assert_eq!(message, "content repository unavailable");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_frame_does_not_resolve_pending_entry() {
    let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
    let client = ChannelPeer::start(client_stream, Arc::new(HandlerRegistry::new()));
    let (mut server_read, mut server_write) = tokio::io::split(server_stream);
    let executor = Handle::current();

    let completion = client.submit(&executor, DoubleOp { value: 21 });
    let (id, code, body) = read_request(&mut server_read).await;
    assert_eq!(code, DOUBLE);
    assert_eq!(body, 21_u32.to_be_bytes());

    // A well-delimited frame with a truncated envelope inside: dropped
    // without touching the pending entry or the channel.
    let valid = envelope::encode_response(
        EnvelopeHeader::new(id),
        ResponseCode::Success,
        &42_u32.to_be_bytes(),
    );
    framing::write_frame(&mut server_write, &valid[..valid.len() - 1])
        .await
        .expect("malformed frame write");
    framing::write_frame(&mut server_write, b"garbage")
        .await
        .expect("garbage frame write");

    sleep(Duration::from_millis(50)).await;
    assert_eq!(completion.state(), CompletionState::Pending);
    assert_eq!(client.registry().pending_len(), 1);

    // A later well-formed response with the same identifier still lands.
    write_response(&mut server_write, id, ResponseCode::Success, &42_u32.to_be_bytes()).await;
    assert_eq!(completion.wait().await.expect("late response"), 42);
    assert_eq!(client.registry().pending_len(), 0);
}

#[tokio::test]
async fn duplicate_response_keeps_first_outcome() {
    let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
    let client = ChannelPeer::start(client_stream, Arc::new(HandlerRegistry::new()));
    let (mut server_read, mut server_write) = tokio::io::split(server_stream);
    let executor = Handle::current();

    let completion = client.submit(&executor, DoubleOp { value: 21 });
    let (id, _, _) = read_request(&mut server_read).await;

    write_response(&mut server_write, id, ResponseCode::Success, &42_u32.to_be_bytes()).await;
    // The duplicate is stale by the time it arrives: the entry is gone.
    write_response(&mut server_write, id, ResponseCode::Success, &99_u32.to_be_bytes()).await;

    sleep(Duration::from_millis(50)).await;
    assert_eq!(completion.wait().await.expect("first response"), 42);
    assert_eq!(client.registry().pending_len(), 0);
}

#[tokio::test]
async fn teardown_fails_all_pending_requests() {
    let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
    let client = ChannelPeer::start(client_stream, Arc::new(HandlerRegistry::new()));
    let executor = Handle::current();

    let completions: Vec<_> = (0..5_u32)
        .map(|value| client.submit(&executor, DoubleOp { value }))
        .collect();

    // Let the write jobs drain, then the peer goes away without answering.
    sleep(Duration::from_millis(50)).await;
    drop(server_stream);

    for completion in completions {
        match completion.wait().await {
            Err(ProtoError::ChannelClosed) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(client.registry().pending_len(), 0);
}

#[tokio::test]
async fn stopped_pool_fails_submission() {
    let (client, _server) = connected_pair();
    let pool = WorkerPool::new(1);
    pool.shutdown();

    let completion = client.submit(&pool, DoubleOp { value: 1 });
    assert_eq!(completion.state(), CompletionState::Failed);
    match completion.wait().await {
        Err(ProtoError::ExecutorStopped) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(client.registry().pending_len(), 0);
}

#[tokio::test]
async fn roundtrip_over_unix_socket() {
    let tmp = tempfile::tempdir().expect("tempdir should be created");
    let socket_path = tmp.path().join("bosun-proto-test.sock");

    let listener = UnixListener::bind(&socket_path).expect("bind should succeed");
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept should succeed");
        let peer = ChannelPeer::start(stream, server_handlers());
        peer.closed().await;
    });

    let stream = UnixStream::connect(&socket_path)
        .await
        .expect("connect should succeed");
    let client = ChannelPeer::start(stream, Arc::new(HandlerRegistry::new()));
    let executor = Handle::current();

    let doubled = client
        .submit(&executor, DoubleOp { value: 1000 })
        .wait()
        .await
        .expect("response should arrive");
    assert_eq!(doubled, 2000);

    client.close();
    server.abort();
}
