use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Prefix for environment overrides, e.g. `AUTHPIPE_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "AUTHPIPE";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Authentication configuration
    #[serde(default)]
    pub authentication: AuthenticationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthenticationConfig {
    /// Scheme run by the authentication middleware
    #[serde(default)]
    pub default_scheme: Option<String>,
    /// Reject requests that do not authenticate successfully
    #[serde(default)]
    pub require_authenticated: bool,
    /// Declared schemes; each enabled one needs a handler at startup
    #[serde(default)]
    pub schemes: Vec<SchemeConfig>,
}

/// A declared authentication scheme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemeConfig {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AuthError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| AuthError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load an optional YAML file with `AUTHPIPE_*` environment overrides on top
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path.as_ref())
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AuthError::Config(format!("Failed to load config: {}", e)))?;

        settings
            .try_deserialize()
            .map_err(|e| AuthError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.timeout_secs == 0 {
            return Err(AuthError::Config(
                "Server timeout must be > 0".to_string(),
            ));
        }

        let auth = &self.authentication;
        let mut seen = HashSet::new();
        for scheme in &auth.schemes {
            if scheme.name.trim().is_empty() {
                return Err(AuthError::Config(
                    "Scheme name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(scheme.name.as_str()) {
                return Err(AuthError::Config(format!(
                    "Scheme declared twice: {}",
                    scheme.name
                )));
            }
        }

        if let Some(default) = &auth.default_scheme {
            let declared = auth
                .schemes
                .iter()
                .any(|s| s.enabled && &s.name == default);
            if !declared {
                return Err(AuthError::Config(format!(
                    "Default scheme '{}' is not an enabled declared scheme",
                    default
                )));
            }
        }

        if auth.require_authenticated && auth.default_scheme.is_none() {
            return Err(AuthError::Config(
                "require_authenticated needs a default_scheme".to_string(),
            ));
        }

        Ok(())
    }
}
