use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::Instrument;

use super::protocol::{
    CallToolRequest, CallToolResponse, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ToolListResponse,
};
use super::registry::ToolRegistry;
use super::testcases::{Lookup, TestCaseStore};

/// JSON-RPC method dispatch shared by every transport.
pub struct McpDispatcher {
    registry: Arc<ToolRegistry>,
    testcases: Arc<TestCaseStore>,
}

impl McpDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, testcases: Arc<TestCaseStore>) -> Self {
        Self {
            registry,
            testcases,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn testcases(&self) -> &Arc<TestCaseStore> {
        &self.testcases
    }

    /// Handle JSON-RPC request
    pub async fn handle(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        // Notifications arrive without an id and must not receive a response per JSON-RPC 2.0
        if req.is_notification() {
            if req.method == "notifications/initialized" {
                tracing::info!("Ignoring notifications/initialized (notification)");
            } else {
                tracing::warn!("Ignoring notification without id: method={}", req.method);
            }
            return None;
        }

        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "tools/list" => self.handle_tools_list(req).await,
            "tools/call" => self.handle_tools_call(req).await,
            _ => JsonRpcResponse::error(req.id, JsonRpcError::method_not_found(&req.method)),
        };

        Some(response)
    }

    /// Handle MCP initialize method
    fn handle_initialize(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let params: InitializeParams = match parse_params(req.params) {
            Ok(params) => params,
            Err(err) => return JsonRpcResponse::error(req.id, err),
        };

        tracing::info!(
            "MCP client initialized: protocol_version={}, client={}",
            params.protocol_version,
            params
                .client_info
                .as_ref()
                .map(|c| c.name.as_str())
                .unwrap_or("unknown")
        );

        JsonRpcResponse::from_result(req.id, &InitializeResult::mock_server())
    }

    /// Handle tools/list method
    async fn handle_tools_list(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let tools = self.registry.list_tools().await;

        tracing::debug!("Listing {} available tools", tools.len());

        JsonRpcResponse::from_result(req.id, &ToolListResponse { tools })
    }

    /// Handle tools/call method
    async fn handle_tools_call(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        let call_req: CallToolRequest = match parse_params(req.params) {
            Ok(params) => params,
            Err(err) => return JsonRpcResponse::error(req.id, err),
        };

        let tool_span = tracing::info_span!("mcp_tool_call", tool = %call_req.name);
        self.call_tool(req.id, call_req).instrument(tool_span).await
    }

    async fn call_tool(&self, id: Option<Value>, call_req: CallToolRequest) -> JsonRpcResponse {
        let tool = match self.registry.get(&call_req.name).await {
            Some(tool) => tool,
            None => {
                tracing::warn!("Tool not found: {}", call_req.name);
                return JsonRpcResponse::error(id, JsonRpcError::tool_not_found(&call_req.name));
            }
        };

        let arguments = call_req.arguments.unwrap_or_default();
        let result = self
            .execute_mock_tool(&tool.name, arguments, tool.default_test_case)
            .await;

        JsonRpcResponse::from_result(id, &result)
    }

    /// Answer a tool call from the recorded test cases.
    pub async fn execute_mock_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        default_test_case: u32,
    ) -> CallToolResponse {
        let testcases = self.testcases.clone();
        let tool = name.to_string();
        let args = arguments.clone();
        let lookup = tokio::task::spawn_blocking(move || {
            testcases.find(&tool, &args, default_test_case)
        })
        .await;

        match lookup {
            Ok(Lookup::Matched { test_case, .. }) | Ok(Lookup::Fallback { test_case, .. }) => {
                test_case.response
            }
            Ok(Lookup::NotFound) => {
                tracing::info!("No test case found for tool {}", name);
                CallToolResponse::error(format!(
                    "No test case found for tool: {} with args: {}",
                    name,
                    Value::Object(arguments)
                ))
            }
            Err(err) => {
                tracing::error!("Test case lookup task failed: {}", err);
                CallToolResponse::error(format!("Error: test case lookup failed for {}", name))
            }
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    match params {
        Some(p) => serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(&e.to_string())),
        None => Err(JsonRpcError::invalid_params("Missing params")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::ToolContent;
    use serde_json::json;
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        dispatcher: McpDispatcher,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config").join("tools.yaml");
        fs::create_dir_all(config.parent().unwrap()).unwrap();
        fs::write(
            &config,
            "tools:\n  - name: mock_echo\n    description: Echo\n  - name: with_default\n    defaultTestCase: 1\n",
        )
        .unwrap();

        let testcases = dir.path().join("testcases");
        fs::create_dir_all(&testcases).unwrap();
        fs::write(
            testcases.join("mock_echo-test-case-1.yaml"),
            "input:\n  message: \"Hello, World!\"\nresponse:\n  content:\n    - type: text\n      text: \"Echo: Hello, World!\"\n",
        )
        .unwrap();
        fs::write(
            testcases.join("with_default-test-case-1.yaml"),
            "input:\n  k: v\nresponse:\n  content:\n    - type: text\n      text: fallback\n",
        )
        .unwrap();

        let registry = Arc::new(ToolRegistry::load(&config));
        let store = Arc::new(TestCaseStore::new(testcases));
        Fixture {
            _dir: dir,
            dispatcher: McpDispatcher::new(registry, store),
        }
    }

    fn request(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(id)),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn initialize_returns_fixed_handshake() {
        let f = fixture();
        let resp = f
            .dispatcher
            .handle(request(
                1,
                "initialize",
                Some(json!({"protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": {"name": "t", "version": "1"}})),
            ))
            .await
            .unwrap();

        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], true);
        assert_eq!(result["serverInfo"]["name"], "mock-mcp-server");
    }

    #[tokio::test]
    async fn initialize_without_params_is_invalid() {
        let f = fixture();
        let resp = f.dispatcher.handle(request(1, "initialize", None)).await.unwrap();
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn tools_list_returns_registry_snapshot() {
        let f = fixture();
        let resp = f.dispatcher.handle(request(2, "tools/list", None)).await.unwrap();
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "mock_echo");
        assert!(tools[0].get("defaultTestCase").is_none());
        assert_eq!(tools[1]["defaultTestCase"], 1);
    }

    #[tokio::test]
    async fn tools_call_returns_matching_test_case() {
        let f = fixture();
        let resp = f
            .dispatcher
            .handle(request(
                3,
                "tools/call",
                Some(json!({"name": "mock_echo", "arguments": {"message": "Hello, World!"}})),
            ))
            .await
            .unwrap();

        let result: CallToolResponse = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(!result.is_error());
        assert_eq!(
            result.content,
            vec![ToolContent::Text {
                text: "Echo: Hello, World!".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn tools_call_without_match_is_an_error_result() {
        let f = fixture();
        let resp = f
            .dispatcher
            .handle(request(
                4,
                "tools/call",
                Some(json!({"name": "mock_echo", "arguments": {"message": "Bye"}})),
            ))
            .await
            .unwrap();

        assert!(resp.error.is_none());
        let result: CallToolResponse = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.is_error());
        match &result.content[0] {
            ToolContent::Text { text } => {
                assert!(text.starts_with("No test case found for tool: mock_echo"));
                assert!(text.contains("Bye"));
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[tokio::test]
    async fn tools_call_uses_configured_default() {
        let f = fixture();
        let resp = f
            .dispatcher
            .handle(request(
                5,
                "tools/call",
                Some(json!({"name": "with_default", "arguments": {"k": "other"}})),
            ))
            .await
            .unwrap();
        let result: CallToolResponse = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(!result.is_error());
        assert_eq!(
            result.content,
            vec![ToolContent::Text {
                text: "fallback".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_a_protocol_error() {
        let f = fixture();
        let resp = f
            .dispatcher
            .handle(request(6, "tools/call", Some(json!({"name": "nope"}))))
            .await
            .unwrap();
        let error = resp.error.unwrap();
        assert_eq!(error.code, -32601);
        assert!(error.message.contains("nope"));
    }

    #[tokio::test]
    async fn non_object_arguments_are_invalid_params() {
        let f = fixture();
        let resp = f
            .dispatcher
            .handle(request(
                7,
                "tools/call",
                Some(json!({"name": "mock_echo", "arguments": [1, 2]})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn unknown_method_and_notifications() {
        let f = fixture();
        let resp = f.dispatcher.handle(request(8, "resources/list", None)).await.unwrap();
        assert_eq!(resp.error.unwrap().code, -32601);

        let notification = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: "notifications/initialized".to_string(),
            params: None,
        };
        assert!(f.dispatcher.handle(notification).await.is_none());
    }
}
