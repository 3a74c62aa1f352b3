mod copy;
pub mod error;
pub mod executor;
pub mod github;
pub mod provider;
pub mod url;
pub mod webhook;

pub use copy::copy_directory;
pub use error::SyncError;
pub use executor::{CommandExecutor, CommandOutput, ShellExecutor};
pub use github::{GitHubSync, SyncReport};
pub use provider::{GitCliProvider, RepositoryProvider};
pub use webhook::{WebhookError, WebhookHandler, WebhookOutcome};
