//! Management request/response protocol core for the bosun fabric.
//!
//! One shared bidirectional byte channel multiplexes any number of in-flight
//! operations. Each request carries a monotonically allocated identifier;
//! the matching response resolves a single-assignment completion that was
//! registered before the request bytes reached the wire. A worker-pool
//! executor decouples request submission from channel I/O, and a single
//! receive task per channel demultiplexes inbound frames into pending
//! completions or operation handlers.

pub mod body;
pub mod channel;
pub mod completion;
pub mod dispatch;
pub mod envelope;
mod error;
pub mod executor;
pub mod framing;
pub mod handler;
pub mod registry;

pub use channel::{ChannelPeer, ChannelStrategy};
pub use completion::{Completion, CompletionState, Resolver};
pub use dispatch::{Dispatcher, Operation};
pub use error::{HandlerError, ProtoError};
pub use executor::{Executor, ExecutorStopped, WorkerPool};
pub use handler::{HandlerRegistry, OperationHandler};
pub use registry::{CorrelationRegistry, Outcome, PendingResponse};
