pub mod dispatch;
pub mod loader;
pub mod protocol;
#[cfg(test)]
mod protocol_tests;
pub mod registry;
pub mod session;
pub mod testcases;
pub mod value;
pub mod watcher;
pub mod websocket;

pub use dispatch::McpDispatcher;
pub use loader::ConfigError;
pub use protocol::*;
pub use registry::ToolRegistry;
pub use session::McpSession;
pub use testcases::{Lookup, TestCase, TestCaseError, TestCaseStore};
pub use watcher::ConfigWatcher;
pub use websocket::mcp_websocket;
