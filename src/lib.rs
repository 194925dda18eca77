//! Ichabod client
//!
//! A blocking HTTP client for the Ichabod server, a headless rendering
//! service that accepts POSTed HTML (or a URL), evaluates JavaScript inside
//! the loaded document and rasterizes the page to an image file.
//!
//! The client does no rendering of its own. It validates parameters, injects
//! the snapshot script the server expects, reserves an output file when the
//! caller did not name one, and hands back the decoded JSON response.
//!
//! # Example
//!
//! ```no_run
//! use ichabod::{ClientConfig, RenderClient, RequestParameters};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RenderClient::new(ClientConfig::default(), true)?;
//! let result = client.rasterize(
//!     RequestParameters::new().html("<h1>Hello, world!</h1>").width(105),
//! )?;
//! println!("rendered to {:?}", result.path());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod client;
pub mod error;
pub mod params;
pub mod validation;

pub use client::RenderClient;
pub use error::{Error, Result};
pub use params::RequestParameters;

/// Host the server is assumed to listen on
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the server is assumed to listen on
pub const DEFAULT_PORT: u16 = 9090;

/// Per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Output format used to pick the temp file suffix when none is requested
pub const DEFAULT_FORMAT: &str = "png";

/// Script that tells the server to snapshot the page and write it to `output`
pub const RASTERIZATION_JS: &str =
    "(function() {ichabod.snapshotPage();ichabod.saveToOutput();})()";

// Environment variables read by `ClientConfig::from_env`
pub const ENV_HOST: &str = "ICHABOD_HOST";
pub const ENV_PORT: &str = "ICHABOD_PORT";
/// Seconds, fractions allowed
pub const ENV_TIMEOUT: &str = "ICHABOD_TIMEOUT";
pub const ENV_FORMAT: &str = "ICHABOD_FORMAT";
pub const ENV_OUTPUT_DIR: &str = "ICHABOD_OUTPUT_DIR";

/// Connection settings for a [`RenderClient`]
///
/// Defaults point at a server running locally with its stock flags:
///
/// ```
/// let cfg = ichabod::ClientConfig::default();
/// assert_eq!(cfg.base_url(), "http://127.0.0.1:9090/");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// URL scheme, `http` or `https`
    pub scheme: String,
    /// Server host name or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Timeout applied to every request
    pub timeout: Duration,
    /// Output format assumed when a request does not carry `format`
    pub default_format: String,
    /// Directory for reserved output files; the system temp dir when `None`
    pub output_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            default_format: DEFAULT_FORMAT.to_string(),
            output_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_default_format(mut self, format: impl Into<String>) -> Self {
        self.default_format = format.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Build a config from `ICHABOD_*` environment variables, using the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ClientConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(host) = lookup(ENV_HOST) {
            cfg.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            cfg.port = port.trim().parse().map_err(|_| {
                Error::ConfigError(format!("{} must be a port number, got '{}'", ENV_PORT, port))
            })?;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            cfg.timeout = parse_timeout_secs(&timeout)?;
        }
        if let Some(format) = lookup(ENV_FORMAT) {
            cfg.default_format = format;
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            cfg.output_dir = Some(PathBuf::from(dir));
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the settings can produce a usable base URL
    pub fn validate(&self) -> Result<()> {
        if self.scheme != "http" && self.scheme != "https" {
            return Err(Error::ConfigError(format!(
                "unsupported scheme '{}'",
                self.scheme
            )));
        }
        if self.host.trim().is_empty() {
            return Err(Error::ConfigError("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(Error::ConfigError("port must be non-zero".into()));
        }
        if self.timeout.is_zero() {
            return Err(Error::ConfigError("timeout must be positive".into()));
        }
        if self.default_format.trim().is_empty() {
            return Err(Error::ConfigError("default format must not be empty".into()));
        }
        url::Url::parse(&self.base_url())
            .map_err(|e| Error::ConfigError(format!("bad base URL {}: {}", self.base_url(), e)))?;
        Ok(())
    }

    /// `{scheme}://{host}:{port}/`, the endpoint render requests are POSTed to
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}/", self.scheme, self.host, self.port)
    }
}

/// Parse a timeout given in (possibly fractional) seconds
pub fn parse_timeout_secs(raw: &str) -> Result<Duration> {
    let secs: f64 = raw.trim().parse().map_err(|_| {
        Error::ConfigError(format!("timeout must be a number of seconds, got '{}'", raw))
    })?;
    match Duration::try_from_secs_f64(secs) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(Error::ConfigError(format!(
            "timeout must be a positive number of seconds, got '{}'",
            raw
        ))),
    }
}

/// Decoded response from the server
///
/// The shape belongs to the server, so the client keeps the JSON as-is. The
/// accessors cover the keys the server is known to emit and return `None`
/// when a key is missing or holds something unexpected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderResult(serde_json::Value);

impl RenderResult {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Raw value for `key`, if the response is an object holding it
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Whether the server reports the conversion succeeded
    pub fn conversion(&self) -> Option<bool> {
        self.get("conversion").and_then(|v| v.as_bool())
    }

    /// Path of the rendered artifact
    pub fn path(&self) -> Option<&str> {
        self.get("path").and_then(|v| v.as_str())
    }

    /// Time spent converting, as reported by the server
    pub fn convert_elapsed(&self) -> Option<f64> {
        self.get("convert_elapsed").and_then(|v| v.as_f64())
    }

    /// Time spent running script, as reported by the server
    pub fn run_elapsed(&self) -> Option<f64> {
        self.get("run_elapsed").and_then(|v| v.as_f64())
    }

    pub fn errors(&self) -> Option<&Vec<serde_json::Value>> {
        self.get("errors").and_then(|v| v.as_array())
    }

    pub fn warnings(&self) -> Option<&Vec<serde_json::Value>> {
        self.get("warnings").and_then(|v| v.as_array())
    }

    /// Value produced by the evaluated script; `None` when absent or null
    pub fn result(&self) -> Option<&serde_json::Value> {
        self.get("result").filter(|v| !v.is_null())
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<RenderResult> for serde_json::Value {
    fn from(result: RenderResult) -> Self {
        result.0
    }
}

/// Rasterize with a one-off client (no health check)
pub fn rasterize(config: ClientConfig, params: RequestParameters) -> Result<RenderResult> {
    RenderClient::new(config, false)?.rasterize(params)
}

/// Evaluate with a one-off client (no health check)
pub fn evaluate(config: ClientConfig, params: RequestParameters) -> Result<RenderResult> {
    RenderClient::new(config, false)?.evaluate(params)
}
