// swcrv-net/src/validation.rs
use swcrv_common::error::{Result, SwcrvError};
use url::{Host, Url};

/// Validates a URL, ensuring it uses the HTTPS scheme. Plain HTTP is accepted
/// for loopback hosts only (local mirrors, test servers).
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str).map_err(|e| {
        SwcrvError::ValidationError(format!("Failed to parse URL '{url_str}': {e}"))
    })?;
    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback(&url) => Ok(url),
        scheme => Err(SwcrvError::ValidationError(format!(
            "Invalid URL scheme for '{url_str}': Must be https, but got '{scheme}'"
        ))),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_and_loopback_http() {
        assert!(validate_url("https://github.com/a/b").is_ok());
        assert!(validate_url("http://127.0.0.1:8080/x").is_ok());
        assert!(validate_url("http://localhost/x").is_ok());
    }

    #[test]
    fn rejects_plain_http_and_garbage() {
        let err = validate_url("http://github.com/a/b").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(validate_url("ftp://127.0.0.1/x").is_err());
        assert!(validate_url("not a url").is_err());
    }
}
