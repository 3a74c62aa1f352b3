use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::protocol::{default_index, is_zero, Tool};

/// Errors raised while reading or parsing the tools document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("tool entry #{index} has no name")]
    MissingName { index: usize },
}

/// Top level of `tools.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub tools: Vec<ToolConfig>,
}

/// One entry of `tools.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
    /// Accepted for compatibility with older documents, never used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(
        rename = "defaultTestCase",
        default,
        deserialize_with = "default_index",
        skip_serializing_if = "is_zero"
    )]
    pub default_test_case: u32,
}

fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

impl From<ToolConfig> for Tool {
    fn from(config: ToolConfig) -> Self {
        Tool {
            name: config.name,
            description: config.description,
            input_schema: config.input_schema,
            default_test_case: config.default_test_case,
        }
    }
}

impl From<&Tool> for ToolConfig {
    fn from(tool: &Tool) -> Self {
        ToolConfig {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema.clone(),
            handler: None,
            default_test_case: tool.default_test_case,
        }
    }
}

/// Parse a tools document into a name-keyed map.
///
/// Later entries with the same name replace earlier ones. An entry without a name invalidates
/// the whole document.
pub fn parse_tools_config(source: &str) -> Result<BTreeMap<String, Tool>, ConfigError> {
    let config: ToolsConfig = serde_yaml::from_str(source)?;

    let mut tools = BTreeMap::new();
    for (index, entry) in config.tools.into_iter().enumerate() {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::MissingName { index });
        }
        tracing::debug!(
            tool = %entry.name,
            default_test_case = entry.default_test_case,
            "Loaded tool"
        );
        tools.insert(entry.name.clone(), Tool::from(entry));
    }

    Ok(tools)
}

/// Read and parse the tools document at `path`.
pub fn read_tools_config(path: &Path) -> Result<BTreeMap<String, Tool>, ConfigError> {
    let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tools_config(&source)
}

/// Built-in tool set used whenever no usable document exists.
pub fn default_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "mock_echo".to_string(),
            description: "Echoes back the input message".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "The message to echo"
                    }
                },
                "required": ["message"]
            }),
            default_test_case: 0,
        },
        Tool {
            name: "mock_calculator".to_string(),
            description: "Performs basic arithmetic operations".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "operation": {
                        "type": "string",
                        "description": "The operation to perform (add, subtract, multiply, divide)",
                        "enum": ["add", "subtract", "multiply", "divide"]
                    },
                    "a": { "type": "number", "description": "First number" },
                    "b": { "type": "number", "description": "Second number" }
                },
                "required": ["operation", "a", "b"]
            }),
            default_test_case: 0,
        },
        Tool {
            name: "mock_delay".to_string(),
            description: "Simulates a delayed operation".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "seconds": {
                        "type": "number",
                        "description": "Number of seconds to delay"
                    }
                },
                "required": ["seconds"]
            }),
            default_test_case: 0,
        },
    ]
}

pub fn default_tool_map() -> BTreeMap<String, Tool> {
    default_tools()
        .into_iter()
        .map(|tool| (tool.name.clone(), tool))
        .collect()
}

/// Render the built-in tool set as a tools document.
pub fn example_document() -> Result<String, serde_yaml::Error> {
    let config = ToolsConfig {
        tools: default_tools().iter().map(ToolConfig::from).collect(),
    };
    serde_yaml::to_string(&config)
}

/// Write the example document to `path` so operators have something to edit.
pub fn write_example_config(path: &Path) -> Result<(), ConfigError> {
    let document = example_document()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, document).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
