pub mod ids;
pub mod paths;
pub mod time;
pub mod wire;

pub use ids::{OperationCode, RequestId};
pub use paths::default_socket_path;
pub use time::now_ms;
pub use wire::{PROTOCOL_VERSION, ResponseCode, UnknownResponseCode, marker};
