#[cfg(test)]
mod tests {
    use crate::mcp::{
        CallToolRequest, CallToolResponse, InitializeParams, InitializeResult, JsonRpcError,
        JsonRpcRequest, JsonRpcResponse, ProgressEvent, Tool, ToolContent,
    };
    use serde_json::json;

    #[test]
    fn test_json_rpc_request_deserialize() {
        let json = r#"{
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"test": "value"}
        }"#;

        let req: JsonRpcRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.jsonrpc, "2.0");
        assert_eq!(req.method, "initialize");
        assert!(req.params.is_some());
        assert!(!req.is_notification());
    }

    #[test]
    fn test_notification_has_no_id() {
        let req: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#)
                .unwrap();
        assert!(req.is_notification());
    }

    #[test]
    fn test_json_rpc_response_error() {
        let response = JsonRpcResponse::error(
            Some(json!(1)),
            JsonRpcError::method_not_found("test_method"),
        );

        assert_eq!(response.jsonrpc, "2.0");
        assert!(response.result.is_none());

        let error = response.error.unwrap();
        assert_eq!(error.code, -32601);
        assert!(error.message.contains("test_method"));
    }

    #[test]
    fn test_json_rpc_error_codes() {
        assert_eq!(JsonRpcError::parse_error().code, -32700);
        assert_eq!(JsonRpcError::invalid_request().code, -32600);
        assert_eq!(JsonRpcError::method_not_found("test").code, -32601);
        assert_eq!(JsonRpcError::tool_not_found("test").code, -32601);
        assert_eq!(JsonRpcError::invalid_params("test").code, -32602);
        assert_eq!(JsonRpcError::internal_error("test").code, -32603);
    }

    #[test]
    fn test_response_omits_absent_fields() {
        let response = JsonRpcResponse::success(Some(json!("abc")), json!({"ok": true}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], "abc");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_tool_default_test_case_on_the_wire() {
        let mut tool = Tool {
            name: "test_tool".to_string(),
            description: "A test tool".to_string(),
            input_schema: json!({"type": "object"}),
            default_test_case: 0,
        };
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["inputSchema"]["type"], "object");
        assert!(value.get("defaultTestCase").is_none());

        tool.default_test_case = 3;
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["defaultTestCase"], 3);
    }

    #[test]
    fn test_call_tool_request_deserialize() {
        let json = r#"{
            "name": "mock_echo",
            "arguments": {"message": "Hello"}
        }"#;

        let req: CallToolRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.name, "mock_echo");
        assert_eq!(req.arguments.unwrap()["message"], "Hello");

        let bare: CallToolRequest = serde_json::from_str(r#"{"name": "mock_echo"}"#).unwrap();
        assert!(bare.arguments.is_none());
    }

    #[test]
    fn test_call_tool_response_error() {
        let response = CallToolResponse::error("Failed".to_string());

        assert_eq!(response.content.len(), 1);
        assert_eq!(response.is_error, Some(true));
        assert!(response.is_error());

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["type"], "text");
    }

    #[test]
    fn test_content_blocks_from_yaml() {
        let yaml = r#"
content:
  - type: text
    text: hello
  - type: json
    json:
      answer: 42
  - type: image
    data: aGVsbG8=
    mimeType: image/png
isError: false
"#;
        let response: CallToolResponse = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(response.content.len(), 3);
        assert_eq!(response.is_error, Some(false));
        match &response.content[1] {
            ToolContent::Json { json } => assert_eq!(json["answer"], 42),
            other => panic!("expected json content, got {:?}", other),
        }
        match &response.content[2] {
            ToolContent::Image { mime_type, .. } => assert_eq!(mime_type, "image/png"),
            other => panic!("expected image content, got {:?}", other),
        }
    }

    #[test]
    fn test_initialize_params_deserialize() {
        let json = r#"{
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }"#;

        let params: InitializeParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.protocol_version, "2024-11-05");

        let client_info = params.client_info.unwrap();
        assert_eq!(client_info.name, "test-client");
        assert_eq!(client_info.version, "1.0.0");
    }

    #[test]
    fn test_initialize_result_serialize() {
        let json = serde_json::to_value(InitializeResult::mock_server()).unwrap();
        assert_eq!(json["protocolVersion"], "2024-11-05");
        assert_eq!(json["serverInfo"]["name"], "mock-mcp-server");
        assert_eq!(json["capabilities"]["tools"]["listChanged"], true);
    }

    #[test]
    fn test_progress_event() {
        let event = serde_json::to_value(ProgressEvent::new("mock_echo", 2, 3)).unwrap();
        assert_eq!(event["type"], "progress");
        assert_eq!(event["message"], "Processing mock_echo... (2/3)");
    }
}
