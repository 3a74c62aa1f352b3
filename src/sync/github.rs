use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::configuration::GitHubSettings;

use super::copy::copy_directory;
use super::error::SyncError;
use super::executor::{CommandExecutor, ShellExecutor};
use super::provider::{GitCliProvider, RepositoryProvider};
use super::url::{authenticated_url, redact_url};

const REPO_DIR: &str = "repo";
const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "tools.yaml";
const TESTCASES_DIR: &str = "testcases";

/// What a sync run refreshed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SyncReport {
    pub config_synced: bool,
    /// Number of files copied, `None` when the repository has no test case directory.
    pub testcases_copied: Option<usize>,
}

/// Mirrors the tools config and test cases of a remote repository into a local cache:
///
/// ```text
/// {cache}/repo/               working copy
/// {cache}/config/tools.yaml   copied config
/// {cache}/testcases/          copied test cases
/// ```
pub struct GitHubSync {
    settings: GitHubSettings,
    provider: Arc<dyn RepositoryProvider>,
    executor: Arc<dyn CommandExecutor>,
}

impl GitHubSync {
    pub fn new(
        settings: GitHubSettings,
        provider: Arc<dyn RepositoryProvider>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            settings,
            provider,
            executor,
        }
    }

    /// Production wiring: `git` and `cp` run as child processes.
    pub fn from_settings(settings: GitHubSettings) -> Self {
        let executor: Arc<dyn CommandExecutor> = Arc::new(ShellExecutor);
        let provider = Arc::new(GitCliProvider::new(executor.clone()));
        Self::new(settings, provider, executor)
    }

    pub fn settings(&self) -> &GitHubSettings {
        &self.settings
    }

    pub fn cache_dir(&self) -> &Path {
        &self.settings.cache_dir
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.settings.cache_dir.join(REPO_DIR)
    }

    /// Local tools config maintained by the sync.
    pub fn config_path(&self) -> PathBuf {
        self.settings.cache_dir.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Local test case directory maintained by the sync.
    pub fn testcases_dir(&self) -> PathBuf {
        self.settings.cache_dir.join(TESTCASES_DIR)
    }

    /// Tools config path inside the repository.
    pub fn repo_config_path(&self) -> &str {
        &self.settings.tools_config_path
    }

    /// Test case directory inside the repository.
    pub fn repo_testcases_path(&self) -> &str {
        &self.settings.testcases_path
    }

    /// Repository URL safe for logs.
    pub fn display_url(&self) -> String {
        redact_url(&self.settings.repo_url)
    }

    fn remote_url(&self) -> String {
        authenticated_url(
            &self.settings.repo_url,
            self.settings.username.as_deref().unwrap_or_default(),
            self.settings.token.as_deref().unwrap_or_default(),
        )
    }

    /// Fetch or update the working copy, then refresh the cached config and test cases.
    /// Blocking; call from the blocking pool.
    pub fn sync(&self) -> Result<SyncReport, SyncError> {
        if self.settings.repo_url.is_empty() {
            return Err(SyncError::MissingRepository);
        }
        let cache_dir = self.cache_dir();
        fs::create_dir_all(cache_dir).map_err(|e| SyncError::io("create", cache_dir, e))?;

        let repo = self.repo_dir();
        let url = self.remote_url();
        let display_url = self.display_url();

        if self.provider.has_working_copy(&repo) {
            tracing::info!(repo = %display_url, "Updating repository");
            if let Err(err) = self.provider.update(&url, &repo) {
                tracing::warn!(
                    repo = %display_url,
                    error = %err,
                    "Repository update failed, keeping the existing copy"
                );
            }
        } else {
            tracing::info!(repo = %display_url, "Cloning repository");
            if repo.exists() {
                fs::remove_dir_all(&repo).map_err(|e| SyncError::io("remove", &repo, e))?;
            }
            self.provider.fetch(&url, &repo)?;
        }

        let config_synced = self.sync_config(&repo)?;
        let testcases_copied = self.sync_testcases(&repo)?;

        tracing::info!(
            repo = %display_url,
            config_synced,
            testcases = testcases_copied.unwrap_or(0),
            "Repository sync complete"
        );
        Ok(SyncReport {
            config_synced,
            testcases_copied,
        })
    }

    fn sync_config(&self, repo: &Path) -> Result<bool, SyncError> {
        let Some(bytes) = self.provider.read_file(repo, self.repo_config_path())? else {
            tracing::info!(
                path = %self.repo_config_path(),
                "Tools config not found in repository, skipping"
            );
            return Ok(false);
        };

        let target = self.config_path();
        write_atomically(&target, &bytes)?;
        tracing::debug!(path = %target.display(), bytes = bytes.len(), "Tools config synced");
        Ok(true)
    }

    fn sync_testcases(&self, repo: &Path) -> Result<Option<usize>, SyncError> {
        let Some(files) = self.provider.list_tree(repo, self.repo_testcases_path())? else {
            tracing::info!(
                path = %self.repo_testcases_path(),
                "Test case directory not found in repository, skipping"
            );
            return Ok(None);
        };

        let target = self.testcases_dir();
        copy_directory(
            self.executor.as_ref(),
            &repo.join(self.repo_testcases_path()),
            &target,
        )?;
        tracing::debug!(path = %target.display(), files = files.len(), "Test cases synced");
        Ok(Some(files.len()))
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| SyncError::io("create", parent, e))?;

    let mut staged =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| SyncError::io("create", parent, e))?;
    staged
        .write_all(bytes)
        .map_err(|e| SyncError::io("write", path, e))?;
    staged
        .persist(path)
        .map_err(|e| SyncError::io("replace", path, e.error))?;
    Ok(())
}
