use super::error::SyncError;

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Abstraction over external command execution (`git`, `cp`).
///
/// Production: `ShellExecutor` runs commands via `std::process::Command`.
/// Tests record commands and script their outcomes instead.
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput, SyncError>;
}

/// Production executor, runs the program as a child process and waits for it.
pub struct ShellExecutor;

impl CommandExecutor for ShellExecutor {
    fn execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput, SyncError> {
        // args may carry credentials, keep them out of the error
        let output = std::process::Command::new(program)
            .args(args)
            .output()
            .map_err(|source| SyncError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
