//! dap-relay — Debug Adapter Protocol stream relay.
//!
//! Supervises a DAP debug adapter as a child process and decodes its
//! Content-Length framed protocol stream into discrete, typed messages,
//! dispatching each one to subscribers by event name (`data`, `event_*`,
//! `request_*`, `response_*`, or a bare custom type name).

pub mod adapter;
pub mod error;
pub mod parser;
pub mod protocol;
pub mod registry;
pub mod transport;

// Re-export key types for convenience.
pub use adapter::{AdapterConfig, DebugAdapterProcess};
pub use error::DapError;
pub use parser::{connect, DisposeHandle, ProtocolParser, ReaderHandle};
pub use protocol::*;
pub use registry::ListenerRegistry;
pub use transport::encode_message;
