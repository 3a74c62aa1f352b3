pub mod health_checks;
pub mod mcp;
pub mod sync;
pub mod testcase;
pub mod webhook;

pub use health_checks::*;
pub use mcp::mcp_post;
pub use sync::{sync_handler, RemoteSync};
pub use testcase::save_handler;
pub use webhook::webhook_handler;
