//! Origin check for WebSocket upgrades
//!
//! An upgrade is accepted when it carries no `Origin` header, when the
//! origin host starts with `localhost`, when it matches the request `Host`
//! (ASCII case-insensitive, same port), or when it is listed in
//! `allowed_origins`.

use axum::http::{HeaderMap, header};
use url::Url;

use crate::config::HubConfig;

#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    enabled: bool,
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn from_config(config: &HubConfig) -> Self {
        Self {
            enabled: config.check_origin,
            allowed: config.allowed_origins.clone(),
        }
    }

    pub fn allows(&self, headers: &HeaderMap) -> bool {
        if !self.enabled {
            return true;
        }
        let Some(origin) = headers.get(header::ORIGIN) else {
            return true;
        };
        let Some(origin) = origin.to_str().ok().and_then(|o| Url::parse(o).ok()) else {
            return false;
        };
        let Some(host) = origin.host_str() else {
            return false;
        };
        let port = origin.port_or_known_default();

        if host.starts_with("localhost") {
            return true;
        }

        // A `Host` without a port means the scheme's default port.
        let default_port = scheme_default_port(&origin);
        let same_host = headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(split_authority)
            .is_some_and(|(request_host, request_port)| {
                request_host.eq_ignore_ascii_case(host)
                    && request_port.or(default_port) == port
            });

        same_host || self.allowed.iter().any(|entry| listed(entry, host, port))
    }
}

fn scheme_default_port(origin: &Url) -> Option<u16> {
    let mut bare = origin.clone();
    bare.set_port(None).ok()?;
    bare.port_or_known_default()
}

fn listed(entry: &str, host: &str, port: Option<u16>) -> bool {
    let (entry_host, entry_port) = split_authority(entry);
    entry_host.eq_ignore_ascii_case(host) && (entry_port.is_none() || entry_port == port)
}

/// Split `host[:port]`, keeping IPv6 brackets on the host
fn split_authority(authority: &str) -> (&str, Option<u16>) {
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => (
                &authority[..=end],
                authority[end + 1..].strip_prefix(':').and_then(|p| p.parse().ok()),
            ),
            None => (authority, None),
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, Some(port)),
            Err(_) => (authority, None),
        },
        None => (authority, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(origin: Option<&str>, host: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_str(host).unwrap());
        if let Some(origin) = origin {
            headers.insert(header::ORIGIN, HeaderValue::from_str(origin).unwrap());
        }
        headers
    }

    fn strict() -> OriginPolicy {
        OriginPolicy::from_config(&HubConfig {
            allowed_origins: vec!["app.example.org".into()],
            ..HubConfig::default()
        })
    }

    #[test]
    fn test_missing_origin_is_allowed() {
        assert!(strict().allows(&headers(None, "hub.example.com")));
    }

    #[test]
    fn test_same_host_case_insensitive() {
        let policy = strict();
        assert!(policy.allows(&headers(Some("https://HUB.example.com"), "hub.example.com")));
        assert!(policy.allows(&headers(Some("http://hub.example.com:8080"), "hub.example.com:8080")));
        assert!(!policy.allows(&headers(Some("http://hub.example.com:9090"), "hub.example.com:8080")));
        assert!(!policy.allows(&headers(Some("http://hub.example.com:9090"), "hub.example.com")));
        assert!(policy.allows(&headers(Some("http://hub.example.com:80"), "hub.example.com")));
        assert!(!policy.allows(&headers(Some("https://hub.example.com"), "hub.example.com:80")));
    }

    #[test]
    fn test_localhost_and_listed_hosts() {
        let policy = strict();
        assert!(policy.allows(&headers(Some("http://localhost:5173"), "hub.example.com")));
        assert!(policy.allows(&headers(Some("https://app.example.org"), "hub.example.com")));
    }

    #[test]
    fn test_foreign_and_garbage_origins_are_rejected() {
        let policy = strict();
        assert!(!policy.allows(&headers(Some("https://evil.example.net"), "hub.example.com")));
        assert!(!policy.allows(&headers(Some("not a url"), "hub.example.com")));
    }

    #[test]
    fn test_disabled_check_allows_everything() {
        let policy = OriginPolicy::from_config(&HubConfig {
            check_origin: false,
            ..HubConfig::default()
        });
        assert!(policy.allows(&headers(Some("https://evil.example.net"), "hub.example.com")));
    }

    #[test]
    fn test_split_authority() {
        assert_eq!(split_authority("a.b:81"), ("a.b", Some(81)));
        assert_eq!(split_authority("a.b"), ("a.b", None));
        assert_eq!(split_authority("[::1]:9000"), ("[::1]", Some(9000)));
        assert_eq!(split_authority("[::1]"), ("[::1]", None));
    }
}
