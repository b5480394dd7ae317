use std::sync::Arc;

use cookie::Cookie;
use http::header::{HeaderName, COOKIE};
use http::{HeaderMap, HeaderValue, Method};
use reqwest::Request as ReqwestRequest;
use tracing::{debug, warn};
use url::Url;

use crate::auth::BasicAuth;
use crate::client::ClientBuilder;
use crate::cookies::CookieJar;
use crate::error::{Error, ExchangeError, Result};
use crate::proxy::{self, ProxyResolver};
use crate::response::{Response, Snapshot};
use crate::transport::Transport;

/// HTTP request representation
///
/// This is what the builder assembles before sending, and what it keeps as
/// the last request. It can also be built by hand and passed to
/// [`RequestBuilder::send`].
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get mutable access to headers
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get the body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Set a header, replacing existing values
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Add a header value, keeping existing values
    pub fn append_header(mut self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = parse_header(name, value)?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Set the body
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Convert to a reqwest request
    ///
    /// An empty body is left off entirely.
    pub fn to_reqwest_request(&self) -> ReqwestRequest {
        let mut request = ReqwestRequest::new(self.method.clone(), self.url.clone());
        *request.headers_mut() = self.headers.clone();
        if !self.body.is_empty() {
            *request.body_mut() = Some(self.body.clone().into());
        }
        request
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = name.parse::<HeaderName>()?;
    let value = value.parse::<HeaderValue>()?;
    Ok((name, value))
}

/// Chainable builder for sequential HTTP requests
///
/// Start a request with one of the method calls ([`get`](Self::get),
/// [`post`](Self::post), ...), configure it, then run it with
/// [`end`](Self::end). Results of the last successful run are kept until the
/// next one succeeds.
///
/// Each method call resets the url, method, headers, basic auth and body,
/// and clears the pending error. Cookies added with
/// [`add_cookies`](Self::add_cookies) and the proxy are kept across requests
/// until cleared explicitly.
///
/// Configuration calls never fail loudly. The first error is kept and every
/// configuration call after it does nothing, so a whole chain can be checked
/// once, through [`error`](Self::error) or the result of `end()`:
///
/// ```no_run
/// # async fn run() -> croc::Result<()> {
/// let mut client = croc::RequestBuilder::new();
/// client
///     .post("http://localhost:8080/items")
///     .set_header("Content-Type", "application/json")
///     .payload(br#"{"a":1}"#.to_vec())
///     .end()
///     .await?;
/// println!("{:?}", client.resp_status());
/// # Ok(())
/// # }
/// ```
///
/// The builder is meant to be driven by one task at a time. Every mutating
/// call takes `&mut self`; share it across tasks only behind a lock.
pub struct RequestBuilder {
    url: String,
    method: Option<Method>,
    headers: HeaderMap,
    cookies: Vec<Cookie<'static>>,
    basic_auth: Option<BasicAuth>,
    body: Vec<u8>,
    proxy: Option<ProxyResolver>,
    error: Option<Error>,
    transport: Box<dyn Transport>,
    cookie_jar: Arc<CookieJar>,
    last_request: Option<Request>,
    last_response: Option<Response>,
    snapshot: Snapshot,
}

impl RequestBuilder {
    /// Create a builder with a fresh cookie jar and the default HTTP transport
    pub fn new() -> Self {
        ClientBuilder::new().build()
    }

    /// Create a builder that sends through `transport`
    pub fn with_transport<T>(transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self::from_parts(Box::new(transport), Arc::new(CookieJar::new()))
    }

    pub(crate) fn from_parts(transport: Box<dyn Transport>, cookie_jar: Arc<CookieJar>) -> Self {
        Self {
            url: String::new(),
            method: None,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            basic_auth: None,
            body: Vec::new(),
            proxy: None,
            error: None,
            transport,
            cookie_jar,
            last_request: None,
            last_response: None,
            snapshot: Snapshot::default(),
        }
    }

    /// Get the first error since the current request was started
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Reset url, method, headers, basic auth and body.
    ///
    /// Cookies and proxy are left alone, see
    /// [`clear_cookies`](Self::clear_cookies) and [`clear_proxy`](Self::clear_proxy).
    pub fn clear_request_data(&mut self) -> &mut Self {
        self.url.clear();
        self.method = None;
        self.headers.clear();
        self.basic_auth = None;
        self.body.clear();
        self
    }

    /// Drop the cookies added for outgoing requests.
    ///
    /// The session cookie jar is not touched.
    pub fn clear_cookies(&mut self) -> &mut Self {
        self.cookies.clear();
        self
    }

    /// Send the following requests directly
    pub fn clear_proxy(&mut self) -> &mut Self {
        self.proxy = None;
        self
    }

    /// Start a request with any method
    pub fn request(&mut self, method: Method, url: impl Into<String>) -> &mut Self {
        self.clear_request_data();
        self.method = Some(method);
        self.url = url.into();
        self.error = None;
        self
    }

    /// Start a GET request
    pub fn get(&mut self, url: impl Into<String>) -> &mut Self {
        self.request(Method::GET, url)
    }

    /// Start a POST request
    pub fn post(&mut self, url: impl Into<String>) -> &mut Self {
        self.request(Method::POST, url)
    }

    /// Start a PUT request
    pub fn put(&mut self, url: impl Into<String>) -> &mut Self {
        self.request(Method::PUT, url)
    }

    /// Start a DELETE request
    pub fn delete(&mut self, url: impl Into<String>) -> &mut Self {
        self.request(Method::DELETE, url)
    }

    /// Start a HEAD request
    pub fn head(&mut self, url: impl Into<String>) -> &mut Self {
        self.request(Method::HEAD, url)
    }

    /// Start a PATCH request
    pub fn patch(&mut self, url: impl Into<String>) -> &mut Self {
        self.request(Method::PATCH, url)
    }

    /// Start an OPTIONS request
    pub fn options(&mut self, url: impl Into<String>) -> &mut Self {
        self.request(Method::OPTIONS, url)
    }

    /// Add cookies to outgoing requests
    pub fn add_cookies<I>(&mut self, cookies: I) -> &mut Self
    where
        I: IntoIterator<Item = Cookie<'static>>,
    {
        if self.error.is_none() {
            self.cookies.extend(cookies);
        }
        self
    }

    /// Set a header, replacing any values already set for the same name
    pub fn set_header(&mut self, key: &str, value: &str) -> &mut Self {
        if self.error.is_none() {
            match parse_header(key, value) {
                Ok((name, value)) => {
                    self.headers.insert(name, value);
                }
                Err(err) => self.record(err),
            }
        }
        self
    }

    /// Add a header value without removing values already set
    pub fn append_header(&mut self, key: &str, value: &str) -> &mut Self {
        if self.error.is_none() {
            match parse_header(key, value) {
                Ok((name, value)) => {
                    self.headers.append(name, value);
                }
                Err(err) => self.record(err),
            }
        }
        self
    }

    /// Use basic authentication.
    ///
    /// The `Authorization` header is sent even for empty credentials.
    pub fn set_basic_auth(&mut self, username: &str, password: &str) -> &mut Self {
        if self.error.is_none() {
            self.basic_auth = Some(BasicAuth::new(username, password));
        }
        self
    }

    /// Send the following requests through the proxy at `proxy_url`
    pub fn proxy(&mut self, proxy_url: &str) -> &mut Self {
        if self.error.is_none() {
            match proxy::parse_proxy_url(proxy_url) {
                Ok(url) => self.proxy = Some(proxy::fixed(url)),
                Err(err) => self.record(err),
            }
        }
        self
    }

    /// Set the raw request body
    pub fn payload(&mut self, data: impl Into<Vec<u8>>) -> &mut Self {
        if self.error.is_none() {
            self.body = data.into();
        }
        self
    }

    fn record(&mut self, err: Error) {
        warn!(error = %err, "request configuration failed");
        self.error = Some(err);
    }

    fn make_request(&self) -> Result<Request> {
        let method = self
            .method
            .clone()
            .ok_or_else(|| Error::config("no method specified"))?;
        if self.url.is_empty() {
            return Err(Error::config("no url specified"));
        }
        let url = Url::parse(&self.url)?;

        let mut request = Request::new(method, url).body_bytes(self.body.clone());
        request.headers = self.headers.clone();
        if let Some(auth) = &self.basic_auth {
            auth.apply_to_headers(&mut request.headers)?;
        }
        if !self.cookies.is_empty() {
            let pairs = self
                .cookies
                .iter()
                .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
                .collect::<Vec<_>>()
                .join("; ");
            let cookie_header = match request.headers.get(COOKIE).map(|v| v.to_str()) {
                Some(Ok(existing)) if !existing.is_empty() => format!("{}; {}", existing, pairs),
                _ => pairs,
            };
            request.headers.insert(COOKIE, cookie_header.parse::<HeaderValue>()?);
        }
        Ok(request)
    }

    /// Send the current request and capture the response.
    ///
    /// Returns the pending error right away if a configuration call failed.
    /// Every error is also kept and reported by [`error`](Self::error). The
    /// response status, headers, body and length are only replaced when the
    /// whole exchange succeeds.
    pub async fn end(&mut self) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let request = match self.make_request() {
            Ok(request) => request,
            Err(err) => {
                self.last_request = None;
                return Err(self.fail(err));
            }
        };
        let outgoing = request.to_reqwest_request();
        debug!(method = %request.method(), url = %request.url(), "sending request");
        self.last_request = Some(request);

        if let Err(err) = self.transport.set_proxy(self.proxy.clone()) {
            return Err(self.fail(err));
        }
        let reqwest_response = match self.transport.send(outgoing).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(err)),
        };

        let response = self
            .last_response
            .insert(Response::from_reqwest_response(reqwest_response));
        let outcome = response
            .read_body()
            .await
            .map(|body| Snapshot::capture(response, body));
        match outcome {
            Ok(snapshot) => {
                debug!(
                    status = ?snapshot.status(),
                    bytes = snapshot.body().len(),
                    "request finished"
                );
                self.snapshot = snapshot;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        warn!(error = %err, "request failed");
        self.error = Some(err.clone());
        err
    }

    /// Send a prepared request through the configured proxy.
    ///
    /// Nothing about the builder's own request, response or error changes.
    /// If the body cannot be read, the error still carries the response.
    pub async fn send(&mut self, request: Request) -> std::result::Result<(Response, Vec<u8>), ExchangeError> {
        self.transport
            .set_proxy(self.proxy.clone())
            .map_err(|err| ExchangeError::new(None, err))?;

        debug!(method = %request.method(), url = %request.url(), "sending prepared request");
        let reqwest_response = self
            .transport
            .send(request.to_reqwest_request())
            .await
            .map_err(|err| ExchangeError::new(None, err))?;

        let mut response = Response::from_reqwest_response(reqwest_response);
        match response.read_body().await {
            Ok(body) => Ok((response, body)),
            Err(err) => Err(ExchangeError::new(Some(response), err)),
        }
    }

    /// Get the last request assembled by `end()`, even if sending it failed
    pub fn last_request(&self) -> Option<&Request> {
        self.last_request.as_ref()
    }

    /// Get the last response received by `end()`
    pub fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    /// Status code of the last successful exchange
    pub fn resp_status(&self) -> Option<http::StatusCode> {
        self.snapshot.status()
    }

    /// Headers of the last successful exchange
    pub fn resp_headers(&self) -> &HeaderMap {
        self.snapshot.headers()
    }

    /// Content length of the last successful exchange, if the server sent one
    pub fn resp_length(&self) -> Option<u64> {
        self.snapshot.content_length()
    }

    /// Body of the last successful exchange
    pub fn raw_resp_body(&self) -> &[u8] {
        self.snapshot.body()
    }

    /// Get the full response snapshot
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Get the HTTP method of the current request
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Get the URL of the current request
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the cookies added for outgoing requests
    pub fn cookies(&self) -> &[Cookie<'static>] {
        &self.cookies
    }

    /// Check whether a proxy is set
    pub fn has_proxy(&self) -> bool {
        self.proxy.is_some()
    }

    /// Get the session cookie jar
    pub fn cookie_jar(&self) -> &CookieJar {
        &self.cookie_jar
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies.len())
            .field("basic_auth", &self.basic_auth)
            .field("body", &format_args!("{} bytes", self.body.len()))
            .field("proxy", &self.proxy.is_some())
            .field("error", &self.error)
            .field("transport", &self.transport.name())
            .finish()
    }
}
