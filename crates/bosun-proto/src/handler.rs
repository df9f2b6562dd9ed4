use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use bosun_core::OperationCode;

use crate::error::HandlerError;

/// Serves one operation code on the receiving peer.
///
/// Handlers run on the channel's receive task. Reading the request body and
/// producing the response body should stay cheap; implementations with
/// significant work hand off to their own execution context and only block
/// the receive path for the minimum time needed.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// Reads the request body and produces the response body.
    async fn handle(&self, request: &[u8]) -> Result<Vec<u8>, HandlerError>;
}

type HandlerMap = HashMap<OperationCode, Arc<dyn OperationHandler>>;

/// Maps operation codes to their handlers on the serving peer.
///
/// A missing code is reported back to the requester as a failed response,
/// never a dropped connection.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HandlerMap>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler, replacing any previous one for the code.
    pub fn register(&self, code: OperationCode, handler: Arc<dyn OperationHandler>) {
        self.write_handlers().insert(code, handler);
    }

    /// Looks up the handler registered for a code.
    pub fn lookup(&self, code: OperationCode) -> Option<Arc<dyn OperationHandler>> {
        self.read_handlers().get(&code).map(Arc::clone)
    }

    fn read_handlers(&self) -> RwLockReadGuard<'_, HandlerMap> {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_handlers(&self) -> RwLockWriteGuard<'_, HandlerMap> {
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use bosun_core::OperationCode;

    use super::{HandlerRegistry, OperationHandler};
    use crate::error::HandlerError;

    struct Upper;

    #[async_trait]
    impl OperationHandler for Upper {
        async fn handle(&self, request: &[u8]) -> Result<Vec<u8>, HandlerError> {
            Ok(request.to_ascii_uppercase())
        }
    }

    #[tokio::test]
    async fn lookup_returns_registered_handler() {
        let registry = HandlerRegistry::new();
        registry.register(OperationCode(0x10), Arc::new(Upper));

        let handler = registry
            .lookup(OperationCode(0x10))
            .expect("handler registered");
        let response = handler.handle(b"ok").await.expect("handler succeeds");
        assert_eq!(response, b"OK");

        assert!(registry.lookup(OperationCode(0x11)).is_none());
    }
}
