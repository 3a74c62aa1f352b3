use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::protocol::CallToolResponse;
use super::value::arguments_match;

/// Highest sequence number scanned when matching.
pub const MAX_TEST_CASES: u32 = 100;

/// A recorded input/output pair for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Expected arguments; only the keys listed here are constrained
    #[serde(default, deserialize_with = "null_as_empty")]
    pub input: BTreeMap<String, Value>,
    pub response: CallToolResponse,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TestCase {
    pub fn matches(&self, args: &Map<String, Value>) -> bool {
        arguments_match(&self.input, args)
    }
}

/// Outcome of a test case lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Test case `index` matched the call arguments
    Matched { index: u32, test_case: TestCase },
    /// Nothing matched; the tool's default test case answered
    Fallback { index: u32, test_case: TestCase },
    NotFound,
}

impl Lookup {
    pub fn into_test_case(self) -> Option<TestCase> {
        match self {
            Self::Matched { test_case, .. } | Self::Fallback { test_case, .. } => Some(test_case),
            Self::NotFound => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TestCaseError {
    #[error("failed to access test case file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse test case YAML {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("failed to marshal test case: {0}")]
    Encode(#[from] serde_yaml::Error),
    #[error("test case number must be between 1 and {max}, got {number}")]
    InvalidNumber { number: u32, max: u32 },
}

/// Directory of `{tool}-test-case-{n}.yaml` files.
#[derive(Debug, Clone)]
pub struct TestCaseStore {
    dir: PathBuf,
}

impl TestCaseStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Locate the test cases next to a tools document: `{config dir}/../testcases`, or
    /// `{config dir}/testcases` when only the latter exists.
    pub fn for_config(config_path: &Path) -> Self {
        let config_dir = match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let parent_dir = config_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config_dir.clone());

        let sibling = parent_dir.join("testcases");
        let nested = config_dir.join("testcases");
        if !sibling.exists() && nested.exists() {
            return Self::new(nested);
        }
        Self::new(sibling)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(tool: &str, number: u32) -> String {
        format!("{}-test-case-{}.yaml", tool, number)
    }

    pub fn file_path(&self, tool: &str, number: u32) -> PathBuf {
        self.dir.join(Self::file_name(tool, number))
    }

    /// Read test case `number` for `tool`; `Ok(None)` when the file does not exist.
    pub fn load(&self, tool: &str, number: u32) -> Result<Option<TestCase>, TestCaseError> {
        let path = self.file_path(tool, number);
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(TestCaseError::Io { path, source }),
        };

        serde_yaml::from_str(&source)
            .map(Some)
            .map_err(|source| TestCaseError::Parse { path, source })
    }

    /// Find the test case answering `tool` called with `args`.
    ///
    /// Test cases 1..=100 are tried in order and the first match wins. Unreadable files are
    /// logged and skipped. When nothing matches and `default_index > 0`, that test case is
    /// returned regardless of its input.
    pub fn find(&self, tool: &str, args: &Map<String, Value>, default_index: u32) -> Lookup {
        tracing::debug!(
            tool,
            dir = %self.dir.display(),
            default_index,
            "Finding test case"
        );

        for index in 1..=MAX_TEST_CASES {
            let test_case = match self.load(tool, index) {
                Ok(Some(test_case)) => test_case,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(tool, index, error = %err, "Error loading test case");
                    continue;
                }
            };

            if test_case.matches(args) {
                tracing::info!(tool, index, "Matched test case");
                return Lookup::Matched { index, test_case };
            }
            tracing::debug!(
                tool,
                index,
                expected = ?test_case.input,
                actual = ?args,
                "Test case did not match"
            );
        }

        if default_index > 0 {
            match self.load(tool, default_index) {
                Ok(Some(test_case)) => {
                    tracing::info!(tool, index = default_index, "Using configured default test case");
                    return Lookup::Fallback {
                        index: default_index,
                        test_case,
                    };
                }
                Ok(None) => tracing::warn!(
                    tool,
                    index = default_index,
                    "Configured default test case not found"
                ),
                Err(err) => tracing::warn!(
                    tool,
                    index = default_index,
                    error = %err,
                    "Configured default test case is unreadable"
                ),
            }
        }

        Lookup::NotFound
    }

    /// Write test case `number` for `tool`, replacing the file in one rename.
    pub fn save(
        &self,
        tool: &str,
        number: u32,
        test_case: &TestCase,
    ) -> Result<PathBuf, TestCaseError> {
        if number == 0 || number > MAX_TEST_CASES {
            return Err(TestCaseError::InvalidNumber {
                number,
                max: MAX_TEST_CASES,
            });
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| TestCaseError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let document = serde_yaml::to_string(test_case)?;
        let path = self.file_path(tool, number);

        let mut staged =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|source| TestCaseError::Io {
                path: self.dir.clone(),
                source,
            })?;
        staged
            .write_all(document.as_bytes())
            .map_err(|source| TestCaseError::Io {
                path: staged.path().to_path_buf(),
                source,
            })?;
        staged.persist(&path).map_err(|err| TestCaseError::Io {
            path: path.clone(),
            source: err.error,
        })?;

        tracing::info!(tool, number, path = %path.display(), "Saved test case");
        Ok(path)
    }
}
