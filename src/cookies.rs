use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};

use cookie::time::OffsetDateTime;
use cookie::Cookie;
use http::HeaderValue;
use tracing::trace;
use url::Url;

/// Session cookie jar
///
/// Stores cookies received from servers and sends them back to the hosts
/// they belong to. Domain cookies are refused for public suffixes, so a
/// response from `a.example.co.uk` cannot plant a cookie for every
/// `*.co.uk` site. The jar is handed to reqwest as its cookie provider and
/// is safe to share between threads.
#[derive(Debug, Default)]
pub struct CookieJar {
    inner: Mutex<Vec<StoredCookie>>,
}

#[derive(Debug, Clone)]
struct StoredCookie {
    cookie: Cookie<'static>,
    domain: String,
    host_only: bool,
    path: String,
    expires: Option<OffsetDateTime>,
}

impl StoredCookie {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires.map_or(false, |at| at <= now)
    }

    fn matches(&self, url: &Url, now: OffsetDateTime) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(&host, &self.domain)
        };

        domain_ok
            && path_matches(url.path(), &self.path)
            && (!self.cookie.secure().unwrap_or(false) || url.scheme() == "https")
            && !self.is_expired(now)
    }

    fn same_identity(&self, other: &StoredCookie) -> bool {
        self.cookie.name() == other.cookie.name()
            && self.domain == other.domain
            && self.path == other.path
    }
}

impl CookieJar {
    /// Create a new empty cookie jar
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cookie received in a `Set-Cookie` header from `url`.
    ///
    /// Returns `false` when the cookie is malformed or not allowed for the
    /// sending host.
    pub fn store_response_cookie(&self, set_cookie: &str, url: &Url) -> bool {
        let Ok(cookie) = Cookie::parse(set_cookie.to_owned()) else {
            trace!(url = %url, "ignoring malformed Set-Cookie header");
            return false;
        };
        let Some(entry) = Self::admit(cookie, url) else {
            return false;
        };

        let now = OffsetDateTime::now_utc();
        let mut jar = self.lock();
        jar.retain(|stored| !stored.same_identity(&entry) && !stored.is_expired(now));
        if !entry.is_expired(now) {
            jar.push(entry);
        }
        true
    }

    // A panic while holding the lock cannot leave the list half-edited.
    fn lock(&self) -> MutexGuard<'_, Vec<StoredCookie>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Decide where a cookie from `url` may be sent, or refuse it.
    fn admit(cookie: Cookie<'static>, url: &Url) -> Option<StoredCookie> {
        let host = url.host_str()?.to_ascii_lowercase();
        let is_ip = host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>().is_ok();

        let (domain, host_only) = match cookie.domain() {
            None | Some("") => (host.clone(), true),
            Some(attr) => {
                let attr = attr.trim_start_matches('.').to_ascii_lowercase();
                if is_ip {
                    if attr != host {
                        trace!(host = %host, domain = %attr, "refusing domain cookie for IP host");
                        return None;
                    }
                    (host.clone(), true)
                } else if psl::suffix_str(&attr) == Some(attr.as_str()) {
                    if attr != host {
                        trace!(host = %host, domain = %attr, "refusing cookie for public suffix");
                        return None;
                    }
                    (host.clone(), true)
                } else if domain_matches(&host, &attr) {
                    (attr, false)
                } else {
                    trace!(host = %host, domain = %attr, "refusing cookie for foreign domain");
                    return None;
                }
            }
        };

        let path = match cookie.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => default_path(url),
        };

        let expires = match cookie.max_age() {
            Some(max_age) => Some(OffsetDateTime::now_utc() + max_age),
            None => cookie.expires_datetime(),
        };

        Some(StoredCookie {
            cookie,
            domain,
            host_only,
            path,
            expires,
        })
    }

    /// Get cookies that should be sent to `url`, longest path first
    pub fn cookies_for_url(&self, url: &Url) -> Vec<Cookie<'static>> {
        let now = OffsetDateTime::now_utc();
        let jar = self.lock();
        let mut matching: Vec<&StoredCookie> =
            jar.iter().filter(|stored| stored.matches(url, now)).collect();
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        matching.into_iter().map(|stored| stored.cookie.clone()).collect()
    }

    /// Get all cookies for `url` as a `Cookie` request header value
    pub fn cookies_string_for_url(&self, url: &Url) -> String {
        self.cookies_for_url(url)
            .iter()
            .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Clear all cookies
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Get the number of cookies in the jar
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cookie jar is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            if let Ok(value) = header.to_str() {
                self.store_response_cookie(value, url);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let value = self.cookies_string_for_url(url);
        if value.is_empty() {
            return None;
        }
        HeaderValue::from_str(&value).ok()
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;

    fn url(s: &str) -> Url {
        s.parse().unwrap()
    }

    #[test]
    fn test_cookie_jar_creation() {
        let jar = CookieJar::new();
        assert!(jar.is_empty());
        assert_eq!(jar.len(), 0);
    }

    #[test]
    fn test_host_only_cookie() {
        let jar = CookieJar::new();
        assert!(jar.store_response_cookie("sid=abc", &url("http://example.com/login")));

        assert_eq!(jar.cookies_string_for_url(&url("http://example.com/")), "sid=abc");
        assert!(jar.cookies_for_url(&url("http://www.example.com/")).is_empty());
    }

    #[test]
    fn test_domain_cookie_reaches_subdomains() {
        let jar = CookieJar::new();
        assert!(jar.store_response_cookie(
            "sid=abc; Domain=.example.com; Path=/",
            &url("http://www.example.com/")
        ));

        assert_eq!(jar.cookies_for_url(&url("http://api.example.com/x")).len(), 1);
        assert!(jar.cookies_for_url(&url("http://notexample.com/")).is_empty());
    }

    #[test]
    fn test_public_suffix_domain_refused() {
        let jar = CookieJar::new();
        assert!(!jar.store_response_cookie("a=1; Domain=co.uk", &url("http://shop.example.co.uk/")));
        assert!(!jar.store_response_cookie("a=1; Domain=com", &url("http://example.com/")));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_foreign_domain_refused() {
        let jar = CookieJar::new();
        assert!(!jar.store_response_cookie("a=1; Domain=other.com", &url("http://example.com/")));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_ip_host_only_accepts_host_only() {
        let jar = CookieJar::new();
        assert!(!jar.store_response_cookie("a=1; Domain=0.0.1", &url("http://127.0.0.1/")));
        assert!(jar.store_response_cookie("a=1", &url("http://127.0.0.1:8080/")));
        assert_eq!(jar.cookies_for_url(&url("http://127.0.0.1:9090/")).len(), 1);
    }

    #[test]
    fn test_path_and_secure_rules() {
        let jar = CookieJar::new();
        jar.store_response_cookie("root=1; Path=/", &url("https://example.com/"));
        jar.store_response_cookie("api=2; Path=/api", &url("https://example.com/"));
        jar.store_response_cookie("tls=3; Path=/; Secure", &url("https://example.com/"));

        assert_eq!(
            jar.cookies_string_for_url(&url("https://example.com/api/v1")),
            "api=2; root=1; tls=3"
        );
        assert_eq!(jar.cookies_string_for_url(&url("http://example.com/apix")), "root=1");
    }

    #[test]
    fn test_default_path_from_request() {
        let jar = CookieJar::new();
        jar.store_response_cookie("a=1", &url("http://example.com/docs/index.html"));

        assert_eq!(jar.cookies_for_url(&url("http://example.com/docs/other")).len(), 1);
        assert!(jar.cookies_for_url(&url("http://example.com/")).is_empty());
    }

    #[test]
    fn test_replace_and_expire() {
        let jar = CookieJar::new();
        let origin = url("http://example.com/");
        jar.store_response_cookie("a=1", &origin);
        jar.store_response_cookie("a=2", &origin);
        assert_eq!(jar.cookies_string_for_url(&origin), "a=2");

        jar.store_response_cookie("a=gone; Max-Age=0", &origin);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_cookie_store_header_round_trip() {
        let jar = CookieJar::new();
        let origin = url("http://example.com/");
        let headers = [
            HeaderValue::from_static("a=1"),
            HeaderValue::from_static("b=2; HttpOnly"),
        ];
        jar.set_cookies(&mut headers.iter(), &origin);

        assert_eq!(jar.cookies(&origin).unwrap(), "a=1; b=2");
        assert!(jar.cookies(&url("http://other.com/")).is_none());

        jar.clear();
        assert!(jar.cookies(&origin).is_none());
    }

    #[test]
    fn test_poisoned_jar_keeps_working() {
        let jar = std::sync::Arc::new(CookieJar::new());
        let origin = url("http://example.com/");
        jar.store_response_cookie("a=1", &origin);

        let poisoner = jar.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poison the jar");
        })
        .join();
        assert!(jar.inner.is_poisoned());

        assert!(jar.store_response_cookie("b=2", &origin));
        assert_eq!(jar.cookies_string_for_url(&origin), "a=1; b=2");
        assert_eq!(jar.len(), 2);
    }
}
