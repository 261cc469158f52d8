//! URL guard against server-side request forgery
//!
//! Validates scheme and rejects hosts in local or private network space.
//! This is a string/range check over the parsed host, not a DNS lookup:
//! a public name that later resolves to a private address is not caught here.

use crate::error::FetchError;
use url::{Host, Url};

/// Schemes accepted by the guard
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Host prefixes rejected outright
const FORBIDDEN_PREFIXES: &[&str] = &["127.", "10.", "192.168."];

/// Validate a URL string for outbound fetching
///
/// Returns the parsed URL on success. Fails with [`FetchError::InvalidFormat`]
/// for unparseable input, [`FetchError::UnsupportedScheme`] for anything but
/// http/https, and [`FetchError::ForbiddenHost`] for local/private hosts.
pub fn validate_url(url: &str) -> Result<Url, FetchError> {
    let parsed = validate_scheme(url)?;
    check_host(&parsed)?;
    Ok(parsed)
}

/// Parse and check the scheme only, leaving the host unchecked
pub(crate) fn validate_scheme(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url.trim()).map_err(|_| FetchError::InvalidFormat(url.to_string()))?;

    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return Err(FetchError::UnsupportedScheme(format!("{}:", parsed.scheme())));
    }

    Ok(parsed)
}

/// Reject a parsed URL whose host is local or private
pub(crate) fn check_host(url: &Url) -> Result<(), FetchError> {
    let host = host_name(url).ok_or_else(|| FetchError::InvalidFormat(url.to_string()))?;

    if is_forbidden_host(&host) {
        return Err(FetchError::ForbiddenHost(host));
    }

    Ok(())
}

/// Host as a bare, lowercase string (IPv6 without brackets)
fn host_name(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_ascii_lowercase()),
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}

/// Check a bare hostname against the local/private ranges
pub fn is_forbidden_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase();

    host == "localhost"
        || FORBIDDEN_PREFIXES.iter().any(|prefix| host.starts_with(prefix))
        || is_private_172(&host)
        || host.ends_with(".local")
        || host == "::1"
        || host.starts_with("fe80:")
}

/// 172.16.0.0 - 172.31.255.255
fn is_private_172(host: &str) -> bool {
    let Some(rest) = host.strip_prefix("172.") else {
        return false;
    };
    let Some((octet, _)) = rest.split_once('.') else {
        return false;
    };
    matches!(octet.parse::<u8>(), Ok(16..=31)) && !octet.starts_with('0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_private_hosts() {
        for url in [
            "http://localhost/",
            "http://127.0.0.1/",
            "http://10.1.2.3/",
            "http://192.168.1.1/",
            "http://172.16.0.5/",
            "http://172.31.255.255/",
            "http://foo.local/",
            "http://[::1]/",
            "http://[fe80::1]/",
        ] {
            let err = validate_url(url).unwrap_err();
            assert!(
                matches!(err, FetchError::ForbiddenHost(_)),
                "{} should be forbidden, got {:?}",
                url,
                err
            );
        }
    }

    #[test]
    fn test_accepts_public_hosts() {
        assert!(validate_url("http://172.32.0.1/").is_ok());
        assert!(validate_url("http://8.8.8.8/").is_ok());
        assert!(validate_url("https://example.com/path?q=1").is_ok());
        assert!(validate_url("http://172.15.0.1/").is_ok());
    }

    #[test]
    fn test_host_case_folded() {
        assert!(matches!(
            validate_url("http://LOCALHOST:8080/"),
            Err(FetchError::ForbiddenHost(_))
        ));
        assert!(matches!(
            validate_url("https://Printer.LOCAL/"),
            Err(FetchError::ForbiddenHost(_))
        ));
        assert!(is_forbidden_host("FE80::abcd"));
    }

    #[test]
    fn test_unsupported_scheme() {
        assert!(matches!(
            validate_url("ftp://example.com/file"),
            Err(FetchError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            validate_url("file:///etc/passwd"),
            Err(FetchError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_invalid_format() {
        assert!(matches!(
            validate_url("not a url"),
            Err(FetchError::InvalidFormat(_))
        ));
        assert!(matches!(validate_url(""), Err(FetchError::InvalidFormat(_))));
    }

    #[test]
    fn test_private_172_boundaries() {
        assert!(is_private_172("172.16.0.0"));
        assert!(is_private_172("172.20.1.1"));
        assert!(is_private_172("172.31.0.1"));
        assert!(!is_private_172("172.15.0.1"));
        assert!(!is_private_172("172.32.0.1"));
        assert!(!is_private_172("172.example.com"));
    }
}
