use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use bosun_core::RequestId;

use crate::{ProtoError, completion::Resolver};

/// Outcome delivered to a pending entry when its request concludes.
pub enum Outcome<'a> {
    /// A successful response arrived; bytes are the response body.
    Success(&'a [u8]),
    /// The request failed before or after reaching the peer.
    Failure(ProtoError),
}

/// One in-flight request awaiting resolution.
///
/// Implementations hold the caller-supplied response reader and the
/// completion resolver; resolving consumes the entry.
pub trait PendingResponse: Send {
    /// Resolves the completion from the outcome, exactly once.
    fn resolve(self: Box<Self>, outcome: Outcome<'_>);
}

/// Pending entry pairing a typed response reader with its resolver.
pub(crate) struct PendingEntry<T, F> {
    pub reader: F,
    pub resolver: Resolver<T>,
}

impl<T, F> PendingResponse for PendingEntry<T, F>
where
    T: Send,
    F: FnOnce(&[u8]) -> Result<T, ProtoError> + Send,
{
    fn resolve(self: Box<Self>, outcome: Outcome<'_>) {
        let entry = *self;
        match outcome {
            Outcome::Success(body) => match (entry.reader)(body) {
                Ok(value) => {
                    entry.resolver.complete(value);
                }
                // A response-body decode failure is not protocol success.
                Err(err) => {
                    entry.resolver.fail(err);
                }
            },
            Outcome::Failure(err) => {
                entry.resolver.fail(err);
            }
        }
    }
}

/// Table mapping request identifiers to pending completions.
///
/// The identifier counter and this table are the only shared mutable state
/// in the core. Identifiers increase monotonically for the registry's
/// lifetime and are never reset.
pub struct CorrelationRegistry {
    next_id: AtomicU64,
    pending: Mutex<HashMap<RequestId, Box<dyn PendingResponse>>>,
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocates the next request identifier.
    pub fn next_id(&self) -> RequestId {
        RequestId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a pending entry for an identifier.
    ///
    /// Must complete before the request bytes are flushed to the channel,
    /// so a fast response can never race an absent entry.
    pub fn register(&self, id: RequestId, entry: Box<dyn PendingResponse>) {
        let replaced = self.lock_pending().insert(id, entry);
        debug_assert!(replaced.is_none(), "request identifier reused while pending");
    }

    /// Removes and resolves the entry for an identifier.
    ///
    /// Returns false when no entry exists: a stale, duplicate, or unknown
    /// response. Callers log those and drop the frame instead of failing
    /// the channel.
    pub fn resolve(&self, id: RequestId, outcome: Outcome<'_>) -> bool {
        let entry = self.lock_pending().remove(&id);
        let Some(entry) = entry else {
            return false;
        };
        entry.resolve(outcome);
        true
    }

    /// Fails every still-pending entry with `ChannelClosed`.
    ///
    /// Invoked on channel teardown so no entry leaks and no caller blocks
    /// forever on a completion.
    pub fn cancel_all(&self) {
        let drained: Vec<_> = self.lock_pending().drain().collect();
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "cancelling pending requests");
        }
        for (_, entry) in drained {
            entry.resolve(Outcome::Failure(ProtoError::ChannelClosed));
        }
    }

    /// Number of in-flight entries, exposed for diagnostics and tests.
    pub fn pending_len(&self) -> usize {
        self.lock_pending().len()
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<RequestId, Box<dyn PendingResponse>>> {
        // A poisoned map only means a resolver panicked mid-entry; recover
        // the remaining entries rather than leaking them.
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
