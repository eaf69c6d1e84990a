use std::path::PathBuf;
use std::time::Duration;

/// Connection settings for [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, kept without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Where the session survives between runs. `None` keeps it in memory.
    pub session_file: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            request_timeout: Duration::from_secs(30),
            session_file: None,
        }
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Reads `CAMBIOTECA_API_URL`, `CAMBIOTECA_TIMEOUT_SECS` and
    /// `CAMBIOTECA_SESSION_FILE`, loading `.env` first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let base_url = std::env::var("CAMBIOTECA_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000/api".into());
        let timeout_secs: u64 = std::env::var("CAMBIOTECA_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()?;
        let session_file = std::env::var("CAMBIOTECA_SESSION_FILE")
            .ok()
            .map(PathBuf::from);

        let mut config = Self::new(base_url);
        config.request_timeout = Duration::from_secs(timeout_secs);
        config.session_file = session_file;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_stripped() {
        let config = ClientConfig::new("http://localhost:8000/api///");
        assert_eq!(config.base_url, "http://localhost:8000/api");
    }
}
