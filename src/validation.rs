// Argument checks run at the top of each public client operation

use crate::params::RequestParameters;
use crate::{Error, Result};

/// Fail unless `key` is present
pub fn require_param(params: &RequestParameters, key: &str) -> Result<()> {
    if params.contains(key) {
        Ok(())
    } else {
        Err(Error::InvalidArguments(format!(
            "Parameter '{}' must be provided.",
            key
        )))
    }
}

/// Fail unless exactly one of `keys` is present
pub fn require_one_of(params: &RequestParameters, keys: &[&str]) -> Result<()> {
    let present = keys.iter().filter(|k| params.contains(k)).count();
    if present == 1 {
        Ok(())
    } else {
        Err(Error::InvalidArguments(format!(
            "Must provide exactly one of these parameters: {}",
            keys.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::keys;

    #[test]
    fn test_require_param() {
        let params = RequestParameters::new().js("1 + 1");
        assert!(require_param(&params, keys::JS).is_ok());

        match require_param(&params, keys::WIDTH) {
            Err(Error::InvalidArguments(msg)) => assert!(msg.contains("'width'")),
            other => panic!("Expected InvalidArguments, got {:?}", other),
        }
    }

    #[test]
    fn test_require_one_of_accepts_exactly_one() {
        let html = RequestParameters::new().html("<p/>");
        let url = RequestParameters::new().url("http://example.com");
        assert!(require_one_of(&html, &[keys::HTML, keys::URL]).is_ok());
        assert!(require_one_of(&url, &[keys::HTML, keys::URL]).is_ok());
    }

    #[test]
    fn test_require_one_of_rejects_none_and_both() {
        let neither = RequestParameters::new();
        let both = RequestParameters::new().html("<p/>").url("http://example.com");

        for params in [&neither, &both] {
            match require_one_of(params, &[keys::HTML, keys::URL]) {
                Err(Error::InvalidArguments(msg)) => assert!(msg.contains("html, url")),
                other => panic!("Expected InvalidArguments, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_empty_value_counts_as_present() {
        let params = RequestParameters::new().html("");
        assert!(require_param(&params, keys::HTML).is_ok());
    }
}
