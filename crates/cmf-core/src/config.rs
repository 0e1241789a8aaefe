//! Configuration system for the CMF MCP server.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Environment variables naming CMF servers, primary first.
pub const BASE_URL_ENV_VARS: [&str; 4] = [
    "CMF_BASE_URL",
    "CMF2_BASE_URL",
    "CMF3_BASE_URL",
    "CMF4_BASE_URL",
];

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CMF server addresses
    pub cmf: CmfConfig,
    /// Backend HTTP client settings
    pub http: HttpConfig,
    /// MCP server settings
    pub server: ServerConfig,
}

/// CMF server addresses. `base_url` is required, the rest are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CmfConfig {
    /// Primary CMF server (CMF_BASE_URL)
    pub base_url: Option<String>,
    /// Second CMF server (CMF2_BASE_URL)
    pub base_url_2: Option<String>,
    /// Third CMF server (CMF3_BASE_URL)
    pub base_url_3: Option<String>,
    /// Fourth CMF server (CMF4_BASE_URL)
    pub base_url_4: Option<String>,
}

impl CmfConfig {
    /// The primary address, if set to a non-blank value.
    pub fn primary(&self) -> Option<&str> {
        non_blank(self.base_url.as_deref())
    }

    /// All configured addresses in slot order, blanks skipped.
    pub fn all_urls(&self) -> Vec<&str> {
        [
            &self.base_url,
            &self.base_url_2,
            &self.base_url_3,
            &self.base_url_4,
        ]
        .into_iter()
        .filter_map(|url| non_blank(url.as_deref()))
        .collect()
    }

    /// Addresses to connect to: slot order, later duplicates dropped.
    pub fn connection_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for url in self.all_urls() {
            if !urls.iter().any(|u| u == url) {
                urls.push(url.to_string());
            }
        }
        urls
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Page size used when walking paginated endpoints
    pub page_size: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            request_timeout_secs: 60,
            page_size: 100,
        }
    }
}

/// Transport the MCP server listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Newline-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// JSON-RPC over HTTP POST
    Http,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            other => Err(Error::Config(format!(
                "Invalid transport '{}'. Valid values: stdio, http",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Transport to serve on
    pub transport: TransportKind,
    /// Bind host for the HTTP transport
    pub host: String,
    /// Bind port for the HTTP transport
    pub port: u16,
    /// Server name reported to MCP clients
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Stdio,
            host: "0.0.0.0".to_string(),
            port: 8000,
            name: "cmf-mcp-server".to_string(),
        }
    }
}

/// Validation result with multiple issues.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// List of validation issues
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    /// Get only error-level issues.
    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Error).collect()
    }

    /// Get only warning-level issues.
    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Warning).collect()
    }

    /// Add an error.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning.
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue
    pub severity: IssueSeverity,
    /// Field path (e.g., "cmf.base_url")
    pub field: String,
    /// Human-readable message
    pub message: String,
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Warnings don't prevent startup
    Warning,
    /// Errors prevent startup
    Error,
}

impl Config {
    /// Build the layered figment without extracting it.
    ///
    /// Later layers win: defaults, user file, project file, explicit file,
    /// `CMF_MCP_*` variables, then the raw `CMF*_BASE_URL` variables.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(Self::config_dir().join("config.toml")))
            .merge(Toml::file(".cmf-mcp/config.toml"));

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed("CMF_MCP_").split("__"))
            .merge(Self::base_url_env())
    }

    /// Maps CMF_BASE_URL..CMF4_BASE_URL onto the `cmf` section.
    fn base_url_env() -> Env {
        Env::raw()
            .only(&BASE_URL_ENV_VARS)
            .map(|key| match key.as_str().to_ascii_uppercase().as_str() {
                "CMF2_BASE_URL" => "cmf.base_url_2".into(),
                "CMF3_BASE_URL" => "cmf.base_url_3".into(),
                "CMF4_BASE_URL" => "cmf.base_url_4".into(),
                _ => "cmf.base_url".into(),
            })
    }

    /// Load configuration from all sources.
    pub fn load(explicit: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(explicit).extract()
    }

    /// Load and validate configuration.
    pub fn load_validated(explicit: Option<&Path>) -> Result<Self, Error> {
        let config = Self::load(explicit).map_err(|e| Error::Config(e.to_string()))?;
        config.ensure_valid()?;
        Ok(config)
    }

    /// Fail on validation errors, log warnings.
    pub fn ensure_valid(&self) -> Result<(), Error> {
        if self.cmf.primary().is_none() {
            return Err(Error::missing_primary_url());
        }

        let result = self.validate();

        if !result.is_ok() {
            let errors: Vec<String> = result
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            return Err(Error::Config(format!(
                "Configuration validation failed:\n  {}",
                errors.join("\n  ")
            )));
        }

        for warning in result.warnings() {
            tracing::warn!("Config warning - {}: {}", warning.field, warning.message);
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.cmf.primary().is_none() {
            result.add_error("cmf.base_url", "Primary CMF server address is required (CMF_BASE_URL)");
        }

        let slots = [
            ("cmf.base_url", &self.cmf.base_url),
            ("cmf.base_url_2", &self.cmf.base_url_2),
            ("cmf.base_url_3", &self.cmf.base_url_3),
            ("cmf.base_url_4", &self.cmf.base_url_4),
        ];
        let mut seen: Vec<&str> = Vec::new();
        for (field, value) in slots {
            let Some(url) = non_blank(value.as_deref()) else {
                continue;
            };
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_error(field, format!("'{}' must start with http:// or https://", url));
            }
            if seen.contains(&url) {
                result.add_warning(field, format!("'{}' is configured more than once and will be used once", url));
            } else {
                seen.push(url);
            }
        }

        if self.http.connect_timeout_secs == 0 {
            result.add_error("http.connect_timeout_secs", "connect_timeout_secs must be greater than 0");
        }

        if self.http.request_timeout_secs == 0 {
            result.add_error("http.request_timeout_secs", "request_timeout_secs must be greater than 0");
        }

        if self.http.page_size == 0 {
            result.add_error("http.page_size", "page_size must be greater than 0");
        }

        if self.server.name.trim().is_empty() {
            result.add_error("server.name", "Server name cannot be empty");
        }

        if self.server.transport == TransportKind::Http && self.server.port == 0 {
            result.add_warning("server.port", "port 0 binds a random port");
        }

        result
    }

    /// Get the configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("cmf-mcp"))
            .unwrap_or_else(|| PathBuf::from("~/.config/cmf-mcp"))
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
