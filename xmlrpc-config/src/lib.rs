use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// XML-RPC server configuration loaded from YAML.
///
/// Only `listen_addr` is required; everything else has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the XML-RPC endpoint listens on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// HTTP path that accepts calls (default: "/RPC2")
    #[serde(default = "default_path")]
    pub path: String,
    /// Largest request body accepted, in bytes (default: 1 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Indentation of response documents; 0 writes them on one line
    #[serde(default)]
    pub indent: usize,
    /// Prometheus metrics configuration
    #[serde(default)]
    pub metrics: Metrics,
    /// Remote endpoint used by command-line calls (optional)
    #[serde(default)]
    pub client: Option<ClientConfig>,
}

fn default_path() -> String {
    "/RPC2".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_metrics_address() -> String {
    "127.0.0.1:9000".to_string()
}

/// Prometheus metrics server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Whether to enable metrics collection
    #[serde(default)]
    pub enabled: bool,
    /// Address to bind metrics HTTP server (default: "127.0.0.1:9000")
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_metrics_address(),
        }
    }
}

/// A remote XML-RPC service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoint URL, http:// only (e.g., "http://betty.userland.com/RPC2")
    pub url: String,
    /// Indentation of request documents
    #[serde(default)]
    pub indent: usize,
}

impl Config {
    /// Loads and validates configuration from a YAML file.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use xmlrpc_config::Config;
    /// use std::path::Path;
    ///
    /// let config = Config::from_file(Path::new("config.yaml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parses and validates configuration from a YAML string.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlrpc_config::Config;
    ///
    /// let yaml = r#"
    /// listen_addr: "0.0.0.0:8080"
    /// metrics:
    ///   enabled: true
    ///   address: "127.0.0.1:9000"
    /// "#;
    ///
    /// let config = Config::parse(yaml).unwrap();
    /// assert_eq!(config.listen_addr, "0.0.0.0:8080");
    /// assert_eq!(config.path, "/RPC2");
    /// ```
    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config = serde_yaml_ng::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot be served.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid listen_addr {:?}: {}", self.listen_addr, e))?;
        if !self.path.starts_with('/') {
            return Err(format!("path must start with '/': {:?}", self.path).into());
        }
        if self.max_body_bytes == 0 {
            return Err("max_body_bytes must be greater than zero".into());
        }
        if self.metrics.enabled {
            self.metrics
                .address
                .parse::<SocketAddr>()
                .map_err(|e| format!("invalid metrics address {:?}: {}", self.metrics.address, e))?;
        }
        if let Some(client) = &self.client
            && !client.url.starts_with("http://")
        {
            return Err(format!("client url must use http://: {:?}", client.url).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config_parsing() {
        let yaml = r#"
listen_addr: "0.0.0.0:8080"
path: "/xmlrpc"
max_body_bytes: 4096
indent: 2
metrics:
  enabled: true
  address: "127.0.0.1:9000"
client:
  url: "http://betty.userland.com/RPC2"
"#;
        let config = Config::parse(yaml).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.path, "/xmlrpc");
        assert_eq!(config.max_body_bytes, 4096);
        assert_eq!(config.indent, 2);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.address, "127.0.0.1:9000");
        let client = config.client.unwrap();
        assert_eq!(client.url, "http://betty.userland.com/RPC2");
        assert_eq!(client.indent, 0);
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse(r#"listen_addr: "127.0.0.1:8080""#).unwrap();
        assert_eq!(config.path, "/RPC2");
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert_eq!(config.indent, 0);
        assert!(!config.metrics.enabled);
        assert_eq!(config.metrics.address, "127.0.0.1:9000");
        assert!(config.client.is_none());
    }

    #[test]
    fn test_missing_required_field() {
        let yaml = r#"
path: "/RPC2"
"#;
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        let yaml = "invalid: yaml: content: ::::";
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn test_empty_config() {
        assert!(Config::parse("").is_err());
    }

    #[test]
    fn test_relative_path_rejected() {
        let yaml = r#"
listen_addr: "127.0.0.1:8080"
path: "RPC2"
"#;
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn test_zero_body_limit_rejected() {
        let yaml = r#"
listen_addr: "127.0.0.1:8080"
max_body_bytes: 0
"#;
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn test_bad_listen_addr_rejected() {
        assert!(Config::parse(r#"listen_addr: "localhost""#).is_err());
    }

    #[test]
    fn test_https_client_rejected() {
        let yaml = r#"
listen_addr: "127.0.0.1:8080"
client:
  url: "https://example.com/RPC2"
"#;
        assert!(Config::parse(yaml).is_err());
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let yaml = r#"
listen_addr: "127.0.0.1:8080"
metrics:
  enabled: false
  address: "not an address"
"#;
        assert!(Config::parse(yaml).is_ok());
    }
}
