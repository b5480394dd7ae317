use std::sync::Arc;

use async_trait::async_trait;
use http::header::COOKIE;
use http::HeaderValue;
use reqwest::{Client as ReqwestClient, Request as ReqwestRequest, Response as ReqwestResponse};
use tracing::debug;

use crate::cookies::CookieJar;
use crate::error::{Error, Result};
use crate::proxy::{self, ProxyResolver};
use crate::timeout::TimeoutConfig;

/// Transport trait for HTTP operations
///
/// The request builder hands every assembled request to a transport. The
/// proxy is pushed to the transport right before each send, so a transport
/// must route the next request with whatever resolver it was last given.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Use `proxy` for the requests that follow; `None` means direct
    fn set_proxy(&mut self, proxy: Option<ProxyResolver>) -> Result<()>;

    /// Send a request and return the response
    async fn send(&self, request: ReqwestRequest) -> Result<ReqwestResponse>;

    /// Get the transport name/type
    fn name(&self) -> &str;
}

/// Transport configuration
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Timeouts applied to every request
    pub timeouts: TimeoutConfig,
    /// Redirects to follow; `None` returns redirect responses as they are
    pub max_redirects: Option<usize>,
    /// `User-Agent` sent when the request does not set one
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            max_redirects: Some(10),
            user_agent: None,
        }
    }
}

/// Default HTTP transport implementation using reqwest
///
/// Connections are never kept for reuse, and the session cookie jar is
/// installed as the client's cookie provider. The underlying client is
/// built on first use and rebuilt whenever a different proxy resolver is set.
pub struct HttpTransport {
    config: TransportConfig,
    cookie_jar: Arc<CookieJar>,
    proxy: Option<ProxyResolver>,
    client: Option<ReqwestClient>,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(config: TransportConfig, cookie_jar: Arc<CookieJar>) -> Self {
        Self {
            config,
            cookie_jar,
            proxy: None,
            client: None,
        }
    }

    /// Get the transport configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Get the session cookie jar
    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.cookie_jar
    }

    fn build_client(&self, proxy: Option<ProxyResolver>) -> Result<ReqwestClient> {
        let mut builder = ReqwestClient::builder()
            .cookie_provider(self.cookie_jar.clone())
            .pool_max_idle_per_host(0)
            .redirect(match self.config.max_redirects {
                Some(max) => reqwest::redirect::Policy::limited(max),
                None => reqwest::redirect::Policy::none(),
            });
        builder = self.config.timeouts.apply_to_builder(builder);
        if let Some(user_agent) = &self.config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        builder = match proxy {
            Some(resolver) => builder.proxy(reqwest::Proxy::custom(move |url| resolver(url))),
            None => builder.no_proxy(),
        };
        builder.build().map_err(Error::from)
    }

    /// Add the session jar's cookies to a request that already carries a
    /// `Cookie` header.
    ///
    /// reqwest only consults its cookie provider for requests without one.
    fn merge_session_cookies(&self, request: &mut ReqwestRequest) {
        let Some(existing) = request.headers().get(COOKIE) else {
            return;
        };
        let session = self.cookie_jar.cookies_string_for_url(request.url());
        if session.is_empty() {
            return;
        }

        let mut merged = existing.as_bytes().to_vec();
        merged.extend_from_slice(b"; ");
        merged.extend_from_slice(session.as_bytes());
        match HeaderValue::from_bytes(&merged) {
            Ok(value) => {
                request.headers_mut().insert(COOKIE, value);
            }
            Err(err) => debug!(error = %err, "session cookies not merged"),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn set_proxy(&mut self, proxy: Option<ProxyResolver>) -> Result<()> {
        if self.client.is_some() && proxy::same_resolver(self.proxy.as_ref(), proxy.as_ref()) {
            return Ok(());
        }
        debug!(proxied = proxy.is_some(), "building HTTP client");
        self.client = Some(self.build_client(proxy.clone())?);
        self.proxy = proxy;
        Ok(())
    }

    async fn send(&self, mut request: ReqwestRequest) -> Result<ReqwestResponse> {
        self.merge_session_cookies(&mut request);
        let client = match &self.client {
            Some(client) => client.clone(),
            None => self.build_client(self.proxy.clone())?,
        };

        if let Some(timeout) = self.config.timeouts.get_timeout() {
            tokio::time::timeout(timeout, client.execute(request))
                .await
                .map_err(|_| Error::timeout(timeout))?
                .map_err(Error::from)
        } else {
            client.execute(request).await.map_err(Error::from)
        }
    }

    fn name(&self) -> &str {
        "HTTP/1.1"
    }
}
