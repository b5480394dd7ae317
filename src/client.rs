use std::sync::Arc;
use std::time::Duration;

use crate::cookies::CookieJar;
use crate::request::RequestBuilder;
use crate::timeout::TimeoutConfig;
use crate::transport::{HttpTransport, TransportConfig};

/// Builder for a [`RequestBuilder`] with custom transport settings
///
/// `RequestBuilder::new()` is the same as `ClientBuilder::new().build()`.
///
/// # Examples
///
/// ```rust
/// use croc::ClientBuilder;
/// use std::time::Duration;
///
/// let client = ClientBuilder::new()
///     .timeout(Duration::from_secs(30))
///     .user_agent("MyApp/1.0")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: TransportConfig,
    cookie_jar: Option<Arc<CookieJar>>,
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for whole requests, body included
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeouts = self.config.timeouts.timeout(timeout);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeouts = self.config.timeouts.connect_timeout(timeout);
        self
    }

    /// Replace all timeout settings
    pub fn timeout_config(mut self, config: TimeoutConfig) -> Self {
        self.config.timeouts = config;
        self
    }

    /// Set the maximum redirects to follow
    pub fn redirect(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = Some(max_redirects);
        self
    }

    /// Disable redirects
    pub fn no_redirect(mut self) -> Self {
        self.config.max_redirects = None;
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Start from an existing session cookie jar
    pub fn cookie_jar(mut self, cookie_jar: Arc<CookieJar>) -> Self {
        self.cookie_jar = Some(cookie_jar);
        self
    }

    /// Build the request builder
    pub fn build(self) -> RequestBuilder {
        let cookie_jar = self.cookie_jar.unwrap_or_default();
        let transport = HttpTransport::new(self.config, cookie_jar.clone());
        RequestBuilder::from_parts(Box::new(transport), cookie_jar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let builder = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(3))
            .user_agent("Test/1.0")
            .no_redirect();

        assert_eq!(builder.config.timeouts.get_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(builder.config.timeouts.get_connect_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(builder.config.user_agent.as_deref(), Some("Test/1.0"));
        assert_eq!(builder.config.max_redirects, None);

        let client = builder.build();
        assert!(client.error().is_none());
        assert!(client.method().is_none());
    }

    #[test]
    fn test_shared_cookie_jar() {
        let jar = Arc::new(CookieJar::new());
        jar.store_response_cookie("sid=1", &"http://example.com/".parse().unwrap());

        let client = ClientBuilder::new().cookie_jar(jar.clone()).build();
        assert_eq!(client.cookie_jar().len(), 1);
    }
}
