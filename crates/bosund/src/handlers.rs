use std::sync::Arc;

use async_trait::async_trait;
use bosun_core::PROTOCOL_VERSION;
use bosun_ops::{Echo, EchoReply, Ping, Pong, ServerInfo, ServerInfoRequest, codes};
use bosun_proto::{HandlerError, HandlerRegistry, OperationHandler, body};

use crate::state::DaemonState;

/// Builds the registry serving the built-in fabric operations.
pub fn builtin_handlers(state: Arc<DaemonState>) -> Arc<HandlerRegistry> {
    let registry = HandlerRegistry::new();
    registry.register(
        codes::PING,
        Arc::new(PingHandler {
            state: Arc::clone(&state),
        }),
    );
    registry.register(
        codes::SERVER_INFO,
        Arc::new(ServerInfoHandler {
            state: Arc::clone(&state),
        }),
    );
    registry.register(codes::ECHO, Arc::new(EchoHandler { state }));
    Arc::new(registry)
}

struct PingHandler {
    state: Arc<DaemonState>,
}

#[async_trait]
impl OperationHandler for PingHandler {
    async fn handle(&self, request: &[u8]) -> Result<Vec<u8>, HandlerError> {
        let ping: Ping = body::decode(request)?;
        self.state.record_served();
        Ok(body::encode(&Pong { nonce: ping.nonce })?)
    }
}

struct ServerInfoHandler {
    state: Arc<DaemonState>,
}

#[async_trait]
impl OperationHandler for ServerInfoHandler {
    async fn handle(&self, request: &[u8]) -> Result<Vec<u8>, HandlerError> {
        let _probe: ServerInfoRequest = body::decode(request)?;
        let served = self.state.record_served();
        Ok(body::encode(&ServerInfo {
            daemon: env!("CARGO_PKG_VERSION").to_string(),
            protocol: PROTOCOL_VERSION,
            uptime_ms: self.state.uptime_ms(),
            served_requests: served,
        })?)
    }
}

struct EchoHandler {
    state: Arc<DaemonState>,
}

#[async_trait]
impl OperationHandler for EchoHandler {
    async fn handle(&self, request: &[u8]) -> Result<Vec<u8>, HandlerError> {
        let echo: Echo = body::decode(request)?;
        self.state.record_served();
        Ok(body::encode(&EchoReply {
            message: echo.message,
        })?)
    }
}
