use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};

/// Picks the proxy for an outgoing request
///
/// Resolvers are consulted by the transport for every request it sends;
/// `None` means the request goes out directly.
pub type ProxyResolver = Arc<dyn Fn(&Url) -> Option<Url> + Send + Sync>;

/// Parse a proxy URL.
///
/// A bare `host:port` is taken as an HTTP proxy, the same way reqwest reads
/// proxy strings without a scheme.
pub fn parse_proxy_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::proxy("Invalid proxy URL: empty"));
    }

    match Url::parse(raw) {
        Ok(url) if url.has_host() => Ok(url),
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("http://{}", raw))
                .map_err(|e| Error::proxy(format!("Invalid proxy URL {:?}: {}", raw, e)))
        }
        Err(e) => Err(Error::proxy(format!("Invalid proxy URL {:?}: {}", raw, e))),
    }
}

/// A resolver that sends every request through `url`
pub fn fixed(url: Url) -> ProxyResolver {
    Arc::new(move |_: &Url| Some(url.clone()))
}

/// Check whether two resolvers are the same instance
pub(crate) fn same_resolver(a: Option<&ProxyResolver>, b: Option<&ProxyResolver>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const (),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url() {
        let url = parse_proxy_url("http://proxy.local:3128").unwrap();
        assert_eq!(url.host_str(), Some("proxy.local"));
        assert_eq!(url.port(), Some(3128));

        let url = parse_proxy_url("socks5://user:pw@127.0.0.1:1080").unwrap();
        assert_eq!(url.scheme(), "socks5");
        assert_eq!(url.username(), "user");
    }

    #[test]
    fn test_parse_host_port() {
        let url = parse_proxy_url("1.2.3.4:1337").unwrap();
        assert_eq!(url.as_str(), "http://1.2.3.4:1337/");

        let url = parse_proxy_url("localhost:8080").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_proxy_url("not a url with control chars").is_err());
        assert!(parse_proxy_url("http://bad\u{0}host").is_err());
        assert!(parse_proxy_url("   ").is_err());
    }

    #[test]
    fn test_fixed_resolver_ignores_request() {
        let proxy: Url = "http://proxy.local:3128".parse().unwrap();
        let resolver = fixed(proxy.clone());

        let a: Url = "https://example.com/a".parse().unwrap();
        let b: Url = "http://other.org/".parse().unwrap();
        assert_eq!(resolver(&a), Some(proxy.clone()));
        assert_eq!(resolver(&b), Some(proxy));
    }

    #[test]
    fn test_same_resolver() {
        let a = fixed("http://p:1".parse().unwrap());
        let b = fixed("http://p:1".parse().unwrap());
        assert!(same_resolver(Some(&a), Some(&a.clone())));
        assert!(!same_resolver(Some(&a), Some(&b)));
        assert!(!same_resolver(Some(&a), None));
        assert!(same_resolver(None, None));
    }
}
