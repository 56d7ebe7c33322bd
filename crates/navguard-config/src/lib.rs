#![warn(missing_docs)]

//! # navguard-config
//!
//! Configuration loading for the navguard sanitizer service.
//!
//! Supports TOML configuration files with environment variable expansion.
//! Every field is optional; the binary maps the overrides onto runtime
//! defaults.
//!
//! ## Example
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:${NAVGUARD_PORT}"
//! max_body_bytes = 262144
//! expose_metrics = true
//!
//! [sanitizer]
//! fail_safe = "reject"
//! location_properties = "any"
//! navigation_globals = ["window", "self"]
//! max_nesting_depth = 256
//! max_syntax_depth = 4096
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Accepted values for `sanitizer.fail_safe`.
pub const FAIL_SAFE_POLICIES: &[&str] = &["reject", "passthrough"];

/// Accepted values for `sanitizer.location_properties`.
pub const LOCATION_PROPERTY_POLICIES: &[&str] = &["any", "href_only"];

/// Errors from config parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Invalid configuration value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level navguard configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavguardConfig {
    /// HTTP service settings.
    #[serde(default)]
    pub server: ServerOverrides,

    /// Sanitizer behavior settings.
    #[serde(default)]
    pub sanitizer: SanitizerOverrides,
}

/// HTTP service overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerOverrides {
    /// Socket address to listen on, e.g. `127.0.0.1:3000`.
    #[serde(default)]
    pub bind: Option<String>,

    /// Largest accepted request body in bytes.
    #[serde(default)]
    pub max_body_bytes: Option<usize>,

    /// Serve Prometheus metrics at `GET /metrics`.
    #[serde(default)]
    pub expose_metrics: Option<bool>,
}

/// Sanitizer overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SanitizerOverrides {
    /// Output on parse failure: "reject" (empty string) or "passthrough".
    #[serde(default)]
    pub fail_safe: Option<String>,

    /// Location property rule set: "any" or "href_only".
    #[serde(default)]
    pub location_properties: Option<String>,

    /// Identifiers treated as the global navigation object.
    #[serde(default)]
    pub navigation_globals: Option<Vec<String>>,

    /// Bracket nesting limit checked before parsing.
    #[serde(default)]
    pub max_nesting_depth: Option<usize>,

    /// Syntax-tree depth limit checked before parsing.
    #[serde(default)]
    pub max_syntax_depth: Option<usize>,
}

impl ServerOverrides {
    /// The configured bind address, parsed.
    pub fn bind_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        self.bind
            .as_deref()
            .map(|bind| {
                bind.parse::<SocketAddr>().map_err(|e| {
                    ConfigError::Invalid(format!("server.bind '{bind}' is not a socket address: {e}"))
                })
            })
            .transpose()
    }
}

impl NavguardConfig {
    /// Parse a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: NavguardConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string, expanding `${ENV_VAR}` references.
    pub fn from_toml_with_env(toml_str: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(toml_str);
        Self::from_toml(&expanded)
    }

    /// Load config from a file path, expanding environment variables.
    pub fn from_file_with_env(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_with_env(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind_addr()?;

        if self.server.max_body_bytes == Some(0) {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".into(),
            ));
        }

        let sanitizer = &self.sanitizer;
        check_one_of("sanitizer.fail_safe", sanitizer.fail_safe.as_deref(), FAIL_SAFE_POLICIES)?;
        check_one_of(
            "sanitizer.location_properties",
            sanitizer.location_properties.as_deref(),
            LOCATION_PROPERTY_POLICIES,
        )?;

        if sanitizer.max_nesting_depth == Some(0) {
            return Err(ConfigError::Invalid(
                "sanitizer.max_nesting_depth must be greater than zero".into(),
            ));
        }

        if sanitizer.max_syntax_depth == Some(0) {
            return Err(ConfigError::Invalid(
                "sanitizer.max_syntax_depth must be greater than zero".into(),
            ));
        }

        if let Some(globals) = &sanitizer.navigation_globals {
            if globals.is_empty() {
                return Err(ConfigError::Invalid(
                    "sanitizer.navigation_globals must name at least one identifier".into(),
                ));
            }
            for global in globals {
                if !is_identifier(global) {
                    return Err(ConfigError::Invalid(format!(
                        "sanitizer.navigation_globals: '{global}' is not a JavaScript identifier"
                    )));
                }
            }
        }

        Ok(())
    }
}

fn check_one_of(field: &str, value: Option<&str>, allowed: &[&str]) -> Result<(), ConfigError> {
    match value {
        Some(v) if !allowed.contains(&v) => Err(ConfigError::Invalid(format!(
            "{field}: unsupported value '{v}', supported: {}",
            allowed.join(", ")
        ))),
        _ => Ok(()),
    }
}

/// ASCII identifier check; globals worth listing are never exotic.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Expand `${ENV_VAR}` patterns in a string using environment variables.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(value) => result.push_str(&value),
                Err(_) => {
                    // Leave the placeholder if env var not found
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}
