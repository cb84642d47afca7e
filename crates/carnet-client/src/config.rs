//! Client configuration.

use serde::Deserialize;
use std::path::PathBuf;

use crate::error::ClientError;

/// Client configuration loaded from environment variables.
///
/// Environment variables are prefixed with `CARNET_`:
/// - `CARNET_SERVER_URL`: API base URL (default: "http://localhost:4000")
/// - `CARNET_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: none)
/// - `CARNET_DATA_DIR`: Directory holding the token (default: `~/.carnet`)
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// API base URL
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Request timeout in seconds; requests wait indefinitely when unset
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Local data directory override
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_server_url() -> String {
    "http://localhost:4000".to_string()
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        let config = envy::prefixed("CARNET_").from_env::<ClientConfig>()?;
        Ok(config.normalized())
    }

    /// Load configuration from an explicit list of variables.
    pub fn from_vars<I>(vars: I) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::prefixed("CARNET_").from_iter::<_, ClientConfig>(vars)?;
        Ok(config.normalized())
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self.normalized()
    }

    /// Directory where the token file lives.
    pub fn data_dir(&self) -> Result<PathBuf, ClientError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| ClientError::Config("Could not find home directory".to_string()))?;
        Ok(home.join(".carnet"))
    }

    fn normalized(mut self) -> Self {
        self.server_url = self.server_url.trim_end_matches('/').to_string();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            request_timeout_secs: None,
            data_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, "http://localhost:4000");
        assert!(config.request_timeout_secs.is_none());
    }

    #[test]
    fn test_from_vars() {
        let config = ClientConfig::from_vars(vec![
            var("CARNET_SERVER_URL", "http://192.168.1.60:4000/"),
            var("CARNET_REQUEST_TIMEOUT_SECS", "15"),
            var("CARNET_DATA_DIR", "/tmp/carnet"),
            var("UNRELATED", "x"),
        ])
        .unwrap();

        assert_eq!(config.server_url, "http://192.168.1.60:4000");
        assert_eq!(config.request_timeout_secs, Some(15));
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/carnet"));
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = ClientConfig::from_vars(Vec::new()).unwrap();
        assert_eq!(config.server_url, "http://localhost:4000");
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_invalid_timeout() {
        let result = ClientConfig::from_vars(vec![var("CARNET_REQUEST_TIMEOUT_SECS", "soon")]);
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_with_server_url_trims_slash() {
        let config = ClientConfig::default().with_server_url("https://carnet.example.org//");
        assert_eq!(config.server_url, "https://carnet.example.org");
    }
}
