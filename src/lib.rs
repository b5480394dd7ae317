//! croc - a chainable HTTP request builder
//!
//! A [`RequestBuilder`] collects everything about one request (method, url,
//! headers, cookies, basic auth, raw body, proxy), sends it, and keeps the
//! last request and response around for inspection.
//!
//! ## Features
//!
//! - **Fluent configuration** with a sticky first error instead of a `Result`
//!   at every step
//! - **Session cookie jar** with public suffix checks
//! - **Per-request cookies** on top of the session jar
//! - **Fixed proxy** that survives across requests
//! - **Pluggable transport**, reqwest by default
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use croc::RequestBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = RequestBuilder::new();
//!     client
//!         .get("https://httpbin.org/get")
//!         .set_header("Accept", "application/json")
//!         .end()
//!         .await?;
//!
//!     println!("Status: {:?}", client.resp_status());
//!     println!("Body: {}", String::from_utf8_lossy(client.raw_resp_body()));
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod cookies;
pub mod error;
pub mod proxy;
pub mod request;
pub mod response;
pub mod timeout;
pub mod transport;

// Re-export main types for convenience
pub use client::ClientBuilder;
pub use error::{Error, ExchangeError, Result};
pub use request::{Request, RequestBuilder};
pub use response::{Response, Snapshot};
pub use transport::{HttpTransport, Transport};

// Re-export common HTTP types
pub use cookie::Cookie;
pub use http::{HeaderMap, HeaderValue, Method, StatusCode};
pub use url::Url;
