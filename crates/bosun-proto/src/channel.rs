use std::{
    io::ErrorKind,
    sync::{Arc, Mutex},
};

use bosun_core::{OperationCode, RequestId, ResponseCode};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::Mutex as AsyncMutex,
    task::JoinHandle,
};

use crate::{
    ProtoError,
    completion::{self, Completion},
    dispatch::Operation,
    envelope::{self, Envelope, EnvelopeHeader},
    executor::Executor,
    framing,
    handler::HandlerRegistry,
    registry::{CorrelationRegistry, Outcome, PendingEntry},
};

type SharedWriter = Arc<AsyncMutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Supplies the channel used for a dispatch.
///
/// Strategies own connection policy (fixed peer, reconnect, pooling); the
/// dispatcher only asks for the channel to use now.
pub trait ChannelStrategy: Send + Sync {
    fn channel(&self) -> Result<Arc<ChannelPeer>, ProtoError>;
}

/// The trivial strategy: always the same established channel.
impl ChannelStrategy for Arc<ChannelPeer> {
    fn channel(&self) -> Result<Arc<ChannelPeer>, ProtoError> {
        Ok(Arc::clone(self))
    }
}

/// One end of a shared management channel.
///
/// Every peer is symmetric: it may submit requests and, through its handler
/// registry, serve requests arriving from the other side. A single receive
/// task demultiplexes inbound frames in arrival order; the write half is
/// guarded by an async mutex so every envelope is atomic on the wire even
/// when worker-pool writes and response writes interleave.
pub struct ChannelPeer {
    registry: Arc<CorrelationRegistry>,
    writer: SharedWriter,
    recv_task: Mutex<Option<JoinHandle<()>>>,
}

impl ChannelPeer {
    /// Splits the stream and starts the receive task.
    pub fn start<S>(stream: S, handlers: Arc<HandlerRegistry>) -> Arc<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let registry = Arc::new(CorrelationRegistry::new());
        let writer: SharedWriter = Arc::new(AsyncMutex::new(Box::new(write_half)));

        let recv_task = tokio::spawn(receive_loop(
            read_half,
            Arc::clone(&registry),
            Arc::clone(&writer),
            handlers,
        ));

        Arc::new(Self {
            registry,
            writer,
            recv_task: Mutex::new(Some(recv_task)),
        })
    }

    /// Dispatches an operation and returns its completion immediately.
    ///
    /// The pending entry is registered before the write job is scheduled,
    /// closing the race where a response could arrive before its entry
    /// exists. A write failure or executor rejection resolves the
    /// completion with the failure; it is never left pending.
    pub fn submit<O: Operation>(
        self: &Arc<Self>,
        executor: &dyn Executor,
        op: O,
    ) -> Completion<O::Response> {
        let id = self.registry.next_id();
        let (resolver, completion) = completion::pair();
        let op = Arc::new(op);

        let reader = {
            let op = Arc::clone(&op);
            move |body: &[u8]| op.read_response(body)
        };
        self.registry.register(id, Box::new(PendingEntry { reader, resolver }));
        tracing::debug!(request_id = id.0, code = op.code().0, "dispatching request");

        let peer = Arc::clone(self);
        let job = Box::pin(async move {
            if let Err(err) = peer.write_request(id, &*op).await {
                tracing::debug!(request_id = id.0, error = %err, "request write failed");
                peer.registry.resolve(id, Outcome::Failure(err));
            }
        });
        if executor.execute(job).is_err() {
            self.registry
                .resolve(id, Outcome::Failure(ProtoError::ExecutorStopped));
        }

        completion
    }

    /// Correlation registry backing this channel.
    pub fn registry(&self) -> &CorrelationRegistry {
        &self.registry
    }

    /// Waits until the receive task exits (stream EOF, error, or close).
    pub async fn closed(&self) {
        let task = self.lock_recv().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Stops the receive task and fails every pending request.
    pub fn close(&self) {
        if let Some(task) = self.lock_recv().take() {
            task.abort();
        }
        self.registry.cancel_all();
    }

    async fn write_request<O: Operation>(&self, id: RequestId, op: &O) -> Result<(), ProtoError> {
        let frame = envelope::encode_request(EnvelopeHeader::new(id), op.code(), |body| {
            op.write_request(body)
        })?;
        let mut writer = self.writer.lock().await;
        framing::write_frame(&mut *writer, &frame).await
    }

    fn lock_recv(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.recv_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ChannelPeer {
    fn drop(&mut self) {
        self.close();
    }
}

/// Single receive path for one channel, invoked once per inbound frame.
async fn receive_loop<R>(
    mut reader: R,
    registry: Arc<CorrelationRegistry>,
    writer: SharedWriter,
    handlers: Arc<HandlerRegistry>,
) where
    R: AsyncRead + Send + Unpin,
{
    loop {
        let frame = match framing::read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(ProtoError::Io(err))
                if matches!(
                    err.kind(),
                    ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::BrokenPipe
                ) =>
            {
                break;
            }
            Err(err) => {
                tracing::warn!(error = %err, "receive path failed");
                break;
            }
        };

        match envelope::decode(&frame) {
            Ok(Envelope::Response { header, code, body }) => {
                deliver_response(&registry, header.request_id, code, body);
            }
            Ok(Envelope::Request { header, code, body }) => {
                if let Err(err) =
                    serve_request(&writer, &handlers, header.request_id, code, body).await
                {
                    tracing::warn!(
                        request_id = header.request_id.0,
                        error = %err,
                        "response write failed"
                    );
                    break;
                }
            }
            // The outer length prefix already resynchronized the stream, so
            // a bad envelope costs one frame, not the channel.
            Err(err) => tracing::warn!(error = %err, "discarding undecodable envelope"),
        }
    }

    registry.cancel_all();
}

fn deliver_response(
    registry: &CorrelationRegistry,
    id: RequestId,
    code: ResponseCode,
    body: &[u8],
) {
    let outcome = match code {
        ResponseCode::Success => Outcome::Success(body),
        ResponseCode::UnknownOperation => Outcome::Failure(ProtoError::UnknownOperation {
            // Payload carries the offending code byte when well-formed.
            code: body.first().copied().unwrap_or(0),
        }),
        ResponseCode::HandlerFailure => Outcome::Failure(ProtoError::HandlerFailure {
            message: String::from_utf8_lossy(body).into_owned(),
        }),
    };

    if !registry.resolve(id, outcome) {
        tracing::debug!(request_id = id.0, "stale response discarded");
    }
}

async fn serve_request(
    writer: &SharedWriter,
    handlers: &HandlerRegistry,
    id: RequestId,
    code: OperationCode,
    body: &[u8],
) -> Result<(), ProtoError> {
    let (response_code, payload) = match handlers.lookup(code) {
        Some(handler) => match handler.handle(body).await {
            Ok(response) => (ResponseCode::Success, response),
            Err(err) => {
                tracing::debug!(request_id = id.0, code = code.0, error = %err, "handler failed");
                (ResponseCode::HandlerFailure, err.message.into_bytes())
            }
        },
        None => {
            tracing::debug!(request_id = id.0, code = code.0, "no handler registered");
            (ResponseCode::UnknownOperation, vec![code.0])
        }
    };

    let frame = envelope::encode_response(EnvelopeHeader::new(id), response_code, &payload);
    let mut writer = writer.lock().await;
    framing::write_frame(&mut *writer, &frame).await
}
