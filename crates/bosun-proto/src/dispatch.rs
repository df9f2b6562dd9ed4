use std::sync::Arc;

use bosun_core::OperationCode;

use crate::{
    ProtoError,
    channel::ChannelStrategy,
    completion::{self, Completion},
    executor::Executor,
};

/// One typed management operation.
///
/// The request writer / response reader pair is the capability each concrete
/// operation supplies; the core treats both bodies as opaque bytes. The code
/// selects which handler processes the body on the receiving peer.
pub trait Operation: Send + Sync + 'static {
    /// Decoded response payload type.
    type Response: Send + 'static;

    /// Operation code sent in the request envelope.
    fn code(&self) -> OperationCode;

    /// Appends the request body to the envelope buffer.
    fn write_request(&self, body: &mut Vec<u8>) -> Result<(), ProtoError>;

    /// Decodes the response body.
    fn read_response(&self, body: &[u8]) -> Result<Self::Response, ProtoError>;
}

/// Submits operations through a channel strategy onto an executor.
///
/// The returned completion is available before the write necessarily
/// happened; callers needing synchronous semantics await it.
pub struct Dispatcher {
    executor: Arc<dyn Executor>,
    strategy: Arc<dyn ChannelStrategy>,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn Executor>, strategy: Arc<dyn ChannelStrategy>) -> Self {
        Self { executor, strategy }
    }

    /// Dispatches an operation and returns its completion immediately.
    ///
    /// Strategy failures resolve the completion instead of raising, so the
    /// caller always has exactly one await point.
    pub fn submit<O: Operation>(&self, op: O) -> Completion<O::Response> {
        match self.strategy.channel() {
            Ok(channel) => channel.submit(self.executor.as_ref(), op),
            Err(err) => completion::failed(err),
        }
    }
}
