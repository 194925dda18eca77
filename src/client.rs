//! Blocking client for the Ichabod server.
//!
//! Every operation is a single synchronous HTTP round trip. The client only
//! reads its configuration after construction, so one instance can be shared
//! across threads.

use crate::params::{keys, RequestParameters};
use crate::validation::{require_one_of, require_param};
use crate::{ClientConfig, Error, RenderResult, Result, RASTERIZATION_JS};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::net::IpAddr;
use std::path::PathBuf;
use tempfile::TempPath;
use url::Url;

/// Client bound to one Ichabod server
#[derive(Debug, Clone)]
pub struct RenderClient {
    client: Client,
    config: ClientConfig,
    base_url: Url,
    health_url: Url,
}

/// True for `localhost` and loopback addresses, which bypass any proxy
pub fn is_loopback_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

/// Append the snapshot trigger to a caller script so it runs last
pub fn compose_evaluation_js(script: &str) -> String {
    format!("{}; {}", script, RASTERIZATION_JS)
}

impl RenderClient {
    /// Create a client for `config`.
    ///
    /// With `check_health` set, the server is probed first and anything other
    /// than a 200 from `/health` (including a refused connection or a
    /// timeout) fails with [`Error::ServiceUnavailable`].
    pub fn new(config: ClientConfig, check_health: bool) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url())
            .map_err(|e| Error::ConfigError(format!("bad base URL: {}", e)))?;
        let health_url = base_url
            .join("health")
            .map_err(|e| Error::ConfigError(format!("bad health URL: {}", e)))?;

        // Remote servers go through HTTP(S)_PROXY like any other request
        let mut builder = Client::builder().timeout(config.timeout);
        if is_loopback_host(&config.host) {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        let this = Self {
            client,
            config,
            base_url,
            health_url,
        };

        if check_health {
            let healthy = match this.is_healthy() {
                Ok(healthy) => healthy,
                Err(e) => {
                    debug!("Health check against {} failed: {}", this.health_url, e);
                    false
                }
            };
            if !healthy {
                return Err(Error::ServiceUnavailable {
                    url: this.base_url.to_string(),
                });
            }
        }

        info!("Ichabod client ready at {}", this.base_url);
        Ok(this)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Endpoint render requests are POSTed to
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn health_url(&self) -> &str {
        self.health_url.as_str()
    }

    /// Probe `/health`.
    ///
    /// Returns `Ok(true)` only for a 200 response. A timeout reads as
    /// unhealthy; other transport failures are returned as errors.
    pub fn is_healthy(&self) -> Result<bool> {
        debug!("GET {}", self.health_url);
        match self.client.get(self.health_url.clone()).send() {
            Ok(response) => Ok(response.status() == StatusCode::OK),
            Err(e) if e.is_timeout() => {
                warn!(
                    "Health check timed out after {:?} at {}",
                    self.config.timeout, self.health_url
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// POST `params` as a form and decode the JSON reply.
    ///
    /// No validation or script injection happens here.
    pub fn request(&self, params: &RequestParameters) -> Result<RenderResult> {
        debug!(
            "POST {} [{}] output={:?}",
            self.base_url,
            params.keys().collect::<Vec<_>>().join(", "),
            params.get(keys::OUTPUT)
        );

        let response = self
            .client
            .post(self.base_url.clone())
            .form(params)
            .send()?
            .error_for_status()?;
        let body = response.text()?;
        let value: serde_json::Value = serde_json::from_str(&body)?;
        Ok(RenderResult::new(value))
    }

    /// Reserve a fresh, empty file for the server to write into.
    ///
    /// The suffix follows `format`, falling back to the configured default.
    /// The file is left on disk and belongs to the caller.
    pub fn reserve_output_path(&self, format: Option<&str>) -> Result<PathBuf> {
        self.reserve_temp_output(format)?
            .keep()
            .map_err(|e| Error::OutputFileError(e.error))
    }

    /// Reserved output file that is deleted again when dropped
    fn reserve_temp_output(&self, format: Option<&str>) -> Result<TempPath> {
        let suffix = format!(".{}", format.unwrap_or(self.config.default_format.as_str()));
        let mut builder = tempfile::Builder::new();
        builder.prefix("ichabod-").suffix(&suffix);
        let file = match &self.config.output_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(Error::OutputFileError)?;
        Ok(file.into_temp_path())
    }

    /// Issue the request, reserving an output file first if none was given.
    ///
    /// A reserved file is handed to the caller only when the request
    /// succeeds; on failure it is removed.
    fn request_with_output(&self, mut params: RequestParameters) -> Result<RenderResult> {
        if params.contains(keys::OUTPUT) {
            return self.request(&params);
        }

        let reserved = self.reserve_temp_output(params.get(keys::FORMAT))?;
        params = params.output(&reserved);
        let result = self.request(&params)?;
        let path = reserved
            .keep()
            .map_err(|e| Error::OutputFileError(e.error))?;
        debug!("Output kept at {}", path.display());
        Ok(result)
    }

    /// Run `js` inside the document given by `html` or `url`, then snapshot it.
    ///
    /// `width` and `height` default to 1. The snapshot script is appended to
    /// the caller's script, so every evaluation also writes an image.
    pub fn evaluate(&self, mut params: RequestParameters) -> Result<RenderResult> {
        require_param(&params, keys::JS)?;
        require_one_of(&params, &[keys::HTML, keys::URL])?;

        params.set_default(keys::WIDTH, "1");
        params.set_default(keys::HEIGHT, "1");
        let script = params.remove(keys::JS).unwrap_or_default();
        params.set(keys::JS, compose_evaluation_js(&script));

        self.request_with_output(params)
    }

    /// [`RenderClient::evaluate`] against inline HTML
    pub fn evaluate_in_html(&self, params: RequestParameters) -> Result<RenderResult> {
        require_param(&params, keys::HTML)?;
        self.evaluate(params)
    }

    /// [`RenderClient::evaluate`] against a URL
    pub fn evaluate_at_url(&self, params: RequestParameters) -> Result<RenderResult> {
        require_param(&params, keys::URL)?;
        self.evaluate(params)
    }

    /// Render the document given by `html` or `url` to an image.
    ///
    /// `width` is required. Any caller `js` is replaced by the snapshot script.
    pub fn rasterize(&self, mut params: RequestParameters) -> Result<RenderResult> {
        require_param(&params, keys::WIDTH)?;
        require_one_of(&params, &[keys::HTML, keys::URL])?;

        if let Some(previous) = params.set(keys::JS, RASTERIZATION_JS) {
            if previous != RASTERIZATION_JS {
                warn!("rasterize ignores caller js; use evaluate to run a script");
            }
        }

        self.request_with_output(params)
    }

    /// [`RenderClient::rasterize`] for inline HTML
    pub fn rasterize_html(&self, params: RequestParameters) -> Result<RenderResult> {
        require_param(&params, keys::HTML)?;
        self.rasterize(params)
    }

    /// [`RenderClient::rasterize`] for a URL
    pub fn rasterize_url(&self, params: RequestParameters) -> Result<RenderResult> {
        require_param(&params, keys::URL)?;
        self.rasterize(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // Nothing listens here; only operations that fail before I/O are tested
    fn offline_client() -> RenderClient {
        RenderClient::new(ClientConfig::default().with_port(1), false)
            .expect("client without health check")
    }

    #[test]
    fn test_compose_evaluation_js_ends_with_snapshot() {
        let js = compose_evaluation_js("document.title = 'x'");
        assert_eq!(
            js,
            "document.title = 'x'; (function() {ichabod.snapshotPage();ichabod.saveToOutput();})()"
        );
        assert!(js.ends_with(RASTERIZATION_JS));
    }

    #[test]
    fn test_urls() {
        let client = offline_client();
        assert_eq!(client.base_url(), "http://127.0.0.1:1/");
        assert_eq!(client.health_url(), "http://127.0.0.1:1/health");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = RenderClient::new(ClientConfig::default().with_host(""), false);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_evaluate_validates_before_io() {
        let client = offline_client();

        let no_js = client.evaluate(RequestParameters::new().html("<p/>"));
        assert!(matches!(no_js, Err(Error::InvalidArguments(_))));

        let no_source = client.evaluate(RequestParameters::new().js("1"));
        assert!(matches!(no_source, Err(Error::InvalidArguments(_))));

        let both = client.evaluate(
            RequestParameters::new()
                .js("1")
                .html("<p/>")
                .url("http://example.com"),
        );
        assert!(matches!(both, Err(Error::InvalidArguments(_))));
    }

    #[test]
    fn test_rasterize_validates_before_io() {
        let client = offline_client();

        let no_width = client.rasterize(RequestParameters::new().html("<p/>"));
        match no_width {
            Err(Error::InvalidArguments(msg)) => assert!(msg.contains("width")),
            other => panic!("Expected InvalidArguments, got {:?}", other),
        }

        let neither = client.rasterize(RequestParameters::new().width(10));
        assert!(matches!(neither, Err(Error::InvalidArguments(_))));
    }

    #[test]
    fn test_shape_guards() {
        let client = offline_client();
        let url_only = RequestParameters::new().url("http://example.com").width(10);
        assert!(matches!(
            client.rasterize_html(url_only.clone()),
            Err(Error::InvalidArguments(_))
        ));
        assert!(matches!(
            client.evaluate_in_html(url_only.js("1")),
            Err(Error::InvalidArguments(_))
        ));

        let html_only = RequestParameters::new().html("<p/>").width(10);
        assert!(matches!(
            client.rasterize_url(html_only.clone()),
            Err(Error::InvalidArguments(_))
        ));
        assert!(matches!(
            client.evaluate_at_url(html_only.js("1")),
            Err(Error::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_reserve_output_path_is_unique_and_suffixed() {
        let client = offline_client();
        let mut seen = HashSet::new();
        for _ in 0..8 {
            let path = client.reserve_output_path(None).unwrap();
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
            assert!(path.exists());
            assert!(seen.insert(path.clone()));
            let _ = std::fs::remove_file(path);
        }

        let jpg = client.reserve_output_path(Some("jpg")).unwrap();
        assert_eq!(jpg.extension().and_then(|e| e.to_str()), Some("jpg"));
        let _ = std::fs::remove_file(jpg);
    }

    #[test]
    fn test_is_loopback_host() {
        assert!(is_loopback_host("127.0.0.1"));
        assert!(is_loopback_host("localhost"));
        assert!(is_loopback_host("[::1]"));
        assert!(!is_loopback_host("render.internal"));
        assert!(!is_loopback_host("10.0.0.5"));
    }

    #[test]
    fn test_remote_host_client_builds() {
        let config = ClientConfig::default().with_host("render.internal");
        let client = RenderClient::new(config, false).unwrap();
        assert_eq!(client.base_url(), "http://render.internal:9090/");
    }

    #[test]
    fn test_reserve_output_path_honours_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let client = RenderClient::new(
            ClientConfig::default().with_port(1).with_output_dir(dir.path()),
            false,
        )
        .unwrap();

        let path = client.reserve_output_path(Some("gif")).unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("gif"));
    }

    #[test]
    fn test_client_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RenderClient>();
    }
}
