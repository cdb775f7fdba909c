//! HTTP client settings shared by the Reddit and Dynalist clients.

use std::time::Duration;

/// Timeouts applied to every outbound request.
///
/// Together with the cycle deadline these bound how long a single cycle can
/// run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl HttpConfig {
    /// Builds a blocking HTTP client with these timeouts and `user_agent`.
    #[must_use]
    pub fn build_client(&self, user_agent: &str) -> reqwest::blocking::Client {
        let mut builder = reqwest::blocking::Client::builder().user_agent(user_agent);
        if self.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(self.timeout_ms));
        }
        if self.connect_timeout_ms > 0 {
            builder = builder.connect_timeout(Duration::from_millis(self.connect_timeout_ms));
        }

        builder.build().unwrap_or_else(|err| {
            tracing::warn!("Failed to build HTTP client: {err}");
            reqwest::blocking::Client::new()
        })
    }
}
