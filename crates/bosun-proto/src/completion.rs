use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU8, Ordering},
};

use tokio::sync::oneshot;

use crate::ProtoError;

const PENDING: u8 = 0;
const COMPLETED: u8 = 1;
const FAILED: u8 = 2;

/// Observable resolution state of a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    /// No outcome recorded yet.
    Pending,
    /// A result was delivered.
    Completed,
    /// A failure was recorded.
    Failed,
}

/// Creates a linked resolver/completion pair for one request.
pub fn pair<T>() -> (Resolver<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    let state = Arc::new(AtomicU8::new(PENDING));
    (
        Resolver {
            tx: Mutex::new(Some(tx)),
            state: Arc::clone(&state),
        },
        Completion { rx, state },
    )
}

/// Returns a completion that is already failed, for dispatch-time errors.
pub(crate) fn failed<T>(error: ProtoError) -> Completion<T> {
    let (resolver, completion) = pair();
    resolver.fail(error);
    completion
}

/// Write side of a completion.
///
/// Transition out of pending happens at most once: the first call to
/// `complete` or `fail` wins and every later attempt is dropped, so a slow
/// duplicate response cannot corrupt an already-delivered result.
pub struct Resolver<T> {
    tx: Mutex<Option<oneshot::Sender<Result<T, ProtoError>>>>,
    state: Arc<AtomicU8>,
}

impl<T> Resolver<T> {
    /// Records a successful result. Returns false if already resolved.
    pub fn complete(&self, value: T) -> bool {
        self.resolve(Ok(value), COMPLETED)
    }

    /// Records a failure. Returns false if already resolved.
    pub fn fail(&self, error: ProtoError) -> bool {
        self.resolve(Err(error), FAILED)
    }

    fn resolve(&self, outcome: Result<T, ProtoError>, state: u8) -> bool {
        let sender = {
            let mut slot = self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            slot.take()
        };
        let Some(sender) = sender else {
            return false;
        };
        self.state.store(state, Ordering::Release);
        // The caller may have dropped its handle; the resolution still counts.
        let _ = sender.send(outcome);
        true
    }
}

/// Read side of a completion, handed to the caller at dispatch time.
///
/// Awaiting blocks only the holder; the channel's receive path resolves
/// completions without ever waiting on callers.
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T, ProtoError>>,
    state: Arc<AtomicU8>,
}

impl<T> Completion<T> {
    /// Waits until the request resolves and returns its result.
    pub async fn wait(self) -> Result<T, ProtoError> {
        match self.rx.await {
            Ok(outcome) => outcome,
            // Resolver dropped without resolving; only teardown does that.
            Err(_) => Err(ProtoError::ChannelClosed),
        }
    }

    /// Non-blocking state check.
    pub fn state(&self) -> CompletionState {
        match self.state.load(Ordering::Acquire) {
            COMPLETED => CompletionState::Completed,
            FAILED => CompletionState::Failed,
            _ => CompletionState::Pending,
        }
    }
}
