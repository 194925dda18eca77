//! Request parameters sent to the server as a form body.
//!
//! The set of keys is open: the documented ones get typed setters, anything
//! else can be added with [`RequestParameters::set`] and is forwarded as-is
//! for the server to interpret.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Parameter names the server understands
pub mod keys {
    pub const HTML: &str = "html";
    pub const URL: &str = "url";
    pub const JS: &str = "js";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const OUTPUT: &str = "output";
    pub const FORMAT: &str = "format";
}

/// Ordered name/value mapping form-encoded into a request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequestParameters {
    entries: BTreeMap<String, String>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inline HTML document to load
    pub fn html(self, html: impl Into<String>) -> Self {
        self.with(keys::HTML, html)
    }

    /// URL the server should load instead of inline HTML
    pub fn url(self, url: impl Into<String>) -> Self {
        self.with(keys::URL, url)
    }

    /// Script to run in the loaded document
    pub fn js(self, js: impl Into<String>) -> Self {
        self.with(keys::JS, js)
    }

    /// Viewport width in pixels
    pub fn width(self, width: u32) -> Self {
        self.with(keys::WIDTH, width.to_string())
    }

    /// Viewport height in pixels
    pub fn height(self, height: u32) -> Self {
        self.with(keys::HEIGHT, height.to_string())
    }

    /// Path the server writes the rendered image to
    pub fn output(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_string_lossy().into_owned();
        self.with(keys::OUTPUT, path)
    }

    /// Output image format, e.g. `png` or `jpg`
    pub fn format(self, format: impl Into<String>) -> Self {
        self.with(keys::FORMAT, format)
    }

    /// Builder form of [`RequestParameters::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace a parameter, returning the previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Insert only if `key` is absent
    pub fn set_default(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K, V> Extend<(K, V)> for RequestParameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_documented_keys() {
        let params = RequestParameters::new()
            .html("<p>x</p>")
            .width(320)
            .height(200)
            .format("jpg")
            .output("/tmp/out.jpg");

        assert_eq!(params.get(keys::HTML), Some("<p>x</p>"));
        assert_eq!(params.get(keys::WIDTH), Some("320"));
        assert_eq!(params.get(keys::HEIGHT), Some("200"));
        assert_eq!(params.get(keys::FORMAT), Some("jpg"));
        assert_eq!(params.get(keys::OUTPUT), Some("/tmp/out.jpg"));
        assert!(!params.contains(keys::URL));
    }

    #[test]
    fn test_unknown_keys_are_kept() {
        let params = RequestParameters::new().with("selector", "#chart");
        assert_eq!(params.get("selector"), Some("#chart"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_set_default_does_not_overwrite() {
        let mut params = RequestParameters::new().width(50);
        params.set_default(keys::WIDTH, "1");
        params.set_default(keys::HEIGHT, "1");
        assert_eq!(params.get(keys::WIDTH), Some("50"));
        assert_eq!(params.get(keys::HEIGHT), Some("1"));
    }

    #[test]
    fn test_from_iterator_and_form_encoding() {
        let params: RequestParameters = vec![("url", "http://a/?b=c"), ("width", "10")]
            .into_iter()
            .collect();
        let encoded = serde_json::to_value(&params).unwrap();
        assert_eq!(encoded["url"], "http://a/?b=c");
        assert_eq!(encoded["width"], "10");
        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["url", "width"]);
    }
}
