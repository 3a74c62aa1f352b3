use mock_mcp::configuration::Settings;
use mock_mcp::startup::{bootstrap, run, AppState};
use std::net::TcpListener;
use std::path::PathBuf;

pub const TOOLS_YAML: &str = r#"tools:
  - name: mock_echo
    description: Echoes back the input message
    inputSchema:
      type: object
      properties:
        message:
          type: string
  - name: mock_calculator
    description: Performs basic arithmetic
    defaultTestCase: 2
"#;

pub struct TestApp {
    pub address: String,
    pub config_path: PathBuf,
    pub testcases_dir: PathBuf,
    pub state: AppState,
    _dir: tempfile::TempDir,
}

/// Lay out `config/tools.yaml` and `testcases/` in a temp dir and serve them on a random port.
pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = dir.path().join("config").join("tools.yaml");
    let testcases_dir = dir.path().join("testcases");
    std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
    std::fs::create_dir_all(&testcases_dir).unwrap();
    std::fs::write(&config_path, TOOLS_YAML).unwrap();
    std::fs::write(
        testcases_dir.join("mock_echo-test-case-1.yaml"),
        "input:\n  message: \"Hello, World!\"\nresponse:\n  content:\n    - type: text\n      text: \"Echo: Hello, World!\"\n  isError: false\n",
    )
    .unwrap();
    std::fs::write(
        testcases_dir.join("mock_calculator-test-case-1.yaml"),
        "input:\n  operation: add\n  a: 5\n  b: 3\nresponse:\n  content:\n    - type: text\n      text: \"Result: 8\"\n",
    )
    .unwrap();
    std::fs::write(
        testcases_dir.join("mock_calculator-test-case-2.yaml"),
        "input:\n  operation: unknown\nresponse:\n  content:\n    - type: text\n      text: \"Unsupported operation\"\n  isError: true\n",
    )
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let settings = Settings {
        app_port: port,
        app_host: "127.0.0.1".to_string(),
        tools_config: config_path.clone(),
        testcases_dir: None,
        github: None,
    };
    let state = bootstrap(&settings).await;
    let server = run(listener, &state).await.expect("Failed to bind address.");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        config_path,
        testcases_dir,
        state,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn rpc(&self, body: serde_json::Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/mcp", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}
