use chrono::{DateTime, Utc};

/// Per-connection bookkeeping for MCP sessions
#[derive(Debug, Clone)]
pub struct McpSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub requests: u64,
}

impl McpSession {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            requests: 0,
        }
    }

    /// Count one inbound request
    pub fn record_request(&mut self) {
        self.requests += 1;
    }

    /// Seconds since the session was opened
    pub fn age_secs(&self) -> i64 {
        (Utc::now() - self.created_at).num_seconds()
    }
}

impl Default for McpSession {
    fn default() -> Self {
        Self::new()
    }
}
