use std::fmt;
use std::path::{Path, PathBuf};

use crate::sync::url::{normalize_repo_url, sanitize_repo_name};

const DEFAULT_CONFIG_PATH: &str = "/app/config/tools.yaml";
const DEFAULT_REPO_CONFIG_PATH: &str = "config/tools.yaml";
const DEFAULT_REPO_TESTCASES_PATH: &str = "testcases";
const SYNC_CACHE_ROOT: &str = "mock-mcp-github-sync";

#[derive(Debug, serde::Deserialize)]
pub struct Settings {
    pub app_port: u16,
    pub app_host: String,
    #[serde(skip)]
    pub tools_config: PathBuf,
    #[serde(skip)]
    pub testcases_dir: Option<PathBuf>,
    #[serde(skip)]
    pub github: Option<GitHubSettings>,
}

/// Remote sync settings, present only when `GITHUB_REPO` is set.
#[derive(Clone)]
pub struct GitHubSettings {
    /// Normalized `https://.../.git` URL.
    pub repo_url: String,
    /// Config document path inside the repository.
    pub tools_config_path: String,
    /// Test case directory inside the repository.
    pub testcases_path: String,
    pub username: Option<String>,
    pub token: Option<String>,
    pub webhook_secret: Option<String>,
    pub cache_dir: PathBuf,
}

impl fmt::Debug for GitHubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSettings")
            .field("repo_url", &self.repo_url)
            .field("tools_config_path", &self.tools_config_path)
            .field("testcases_path", &self.testcases_path)
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "***"))
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

impl GitHubSettings {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let repo_url = normalize_repo_url(&var("GITHUB_REPO")?);
        if repo_url.is_empty() {
            return None;
        }

        let cache_dir = var("GITHUB_SYNC_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::temp_dir()
                    .join(SYNC_CACHE_ROOT)
                    .join(sanitize_repo_name(&repo_url))
            });

        Some(GitHubSettings {
            tools_config_path: var("GITHUB_TOOLS_CONFIG_PATH")
                .unwrap_or_else(|| DEFAULT_REPO_CONFIG_PATH.to_string()),
            testcases_path: var("GITHUB_TESTCASES_PATH")
                .unwrap_or_else(|| DEFAULT_REPO_TESTCASES_PATH.to_string()),
            username: var("GITHUB_USERNAME"),
            token: var("GITHUB_TOKEN"),
            webhook_secret: var("GITHUB_WEBHOOK_SECRET"),
            repo_url,
            cache_dir,
        })
    }
}

/// `TOOLS_CONFIG`, or the first existing well-known location, or the container default.
pub fn resolve_tools_config_path() -> PathBuf {
    if let Some(path) = std::env::var("TOOLS_CONFIG").ok().filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    let wd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    discover_tools_config(&wd).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn discover_tools_config(wd: &Path) -> Option<PathBuf> {
    let candidates = [
        PathBuf::from(DEFAULT_CONFIG_PATH),
        wd.join("config").join("tools.yaml"),
        wd.join("..").join("config").join("tools.yaml"),
        wd.join("..").join("..").join("config").join("tools.yaml"),
    ];
    candidates.into_iter().find(|path| path.exists())
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let settings = config::Config::builder()
        .set_default("app_host", "0.0.0.0")?
        .set_default("app_port", 8080)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("MOCK_MCP"))
        .build()?;

    let mut config: Settings = settings.try_deserialize()?;

    config.tools_config = resolve_tools_config_path();
    config.testcases_dir = std::env::var("TESTCASES_DIR")
        .ok()
        .filter(|d| !d.is_empty())
        .map(PathBuf::from);
    config.github = GitHubSettings::from_env();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn github_settings_need_a_repository() {
        assert!(GitHubSettings::from_lookup(lookup(&[])).is_none());
        assert!(GitHubSettings::from_lookup(lookup(&[("GITHUB_REPO", "  ")])).is_none());
    }

    #[test]
    fn github_settings_defaults() {
        let settings = GitHubSettings::from_lookup(lookup(&[("GITHUB_REPO", "acme/mocks")])).unwrap();

        assert_eq!(settings.repo_url, "https://github.com/acme/mocks.git");
        assert_eq!(settings.tools_config_path, "config/tools.yaml");
        assert_eq!(settings.testcases_path, "testcases");
        assert!(settings.username.is_none());
        assert!(settings.webhook_secret.is_none());
        assert_eq!(
            settings.cache_dir,
            std::env::temp_dir()
                .join("mock-mcp-github-sync")
                .join("github.com_acme_mocks")
        );
    }

    #[test]
    fn github_settings_overrides_and_redacted_debug() {
        let settings = GitHubSettings::from_lookup(lookup(&[
            ("GITHUB_REPO", "https://github.com/acme/mocks"),
            ("GITHUB_TOOLS_CONFIG_PATH", "tools.yaml"),
            ("GITHUB_TESTCASES_PATH", "fixtures"),
            ("GITHUB_USERNAME", "bot"),
            ("GITHUB_TOKEN", "s3cr3t"),
            ("GITHUB_WEBHOOK_SECRET", "hook"),
            ("GITHUB_SYNC_CACHE_DIR", "/var/cache/mocks"),
        ]))
        .unwrap();

        assert_eq!(settings.tools_config_path, "tools.yaml");
        assert_eq!(settings.testcases_path, "fixtures");
        assert_eq!(settings.cache_dir, PathBuf::from("/var/cache/mocks"));
        assert_eq!(settings.token.as_deref(), Some("s3cr3t"));

        let debug = format!("{:?}", settings);
        assert!(!debug.contains("s3cr3t"));
        assert!(!debug.contains("\"hook\""));
    }

    #[test]
    fn discovery_prefers_working_directory_config() {
        let dir = tempfile::tempdir().unwrap();
        let wd = dir.path().join("a").join("b");
        std::fs::create_dir_all(&wd).unwrap();
        let config = dir.path().join("config").join("tools.yaml");
        std::fs::create_dir_all(config.parent().unwrap()).unwrap();
        std::fs::write(&config, "tools: []\n").unwrap();

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            return;
        }
        let found = discover_tools_config(&wd).unwrap();
        assert_eq!(found, wd.join("..").join("..").join("config").join("tools.yaml"));
        assert!(discover_tools_config(dir.path().join("a").as_path()).is_some());
    }
}
