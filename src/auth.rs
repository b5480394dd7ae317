use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use http::{header::AUTHORIZATION, HeaderMap, HeaderValue};

use crate::error::Result;

/// Credentials for HTTP basic authentication
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    /// Create new basic credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Get the username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the password
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Value for the `Authorization` header
    pub fn header_value(&self) -> Result<HeaderValue> {
        let credentials = format!("{}:{}", self.username, self.password);
        let mut value = HeaderValue::from_str(&format!("Basic {}", BASE64.encode(credentials)))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Replace any `Authorization` header with these credentials
    pub fn apply_to_headers(&self, headers: &mut HeaderMap) -> Result<()> {
        headers.insert(AUTHORIZATION, self.header_value()?);
        Ok(())
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        let auth = BasicAuth::new("user", "pass");
        assert_eq!(auth.header_value().unwrap(), "Basic dXNlcjpwYXNz");
        assert!(auth.header_value().unwrap().is_sensitive());
    }

    #[test]
    fn test_empty_credentials_still_encode() {
        let auth = BasicAuth::new("", "");
        assert_eq!(auth.header_value().unwrap(), "Basic Og==");
    }

    #[test]
    fn test_apply_replaces_existing_authorization() {
        let mut headers = HeaderMap::new();
        headers.append(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.append(AUTHORIZATION, HeaderValue::from_static("Bearer def"));

        BasicAuth::new("user", "pass").apply_to_headers(&mut headers).unwrap();

        let values: Vec<_> = headers.get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values, vec!["Basic dXNlcjpwYXNz"]);
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", BasicAuth::new("user", "hunter2"));
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }
}
