use std::time::Duration;

/// Timeout settings applied by the HTTP transport
///
/// Nothing is limited by default: a request waits as long as the server
/// keeps the connection open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Overall request timeout, including reading the body
    pub timeout: Option<Duration>,
    /// Connection establishment timeout
    pub connect_timeout: Option<Duration>,
}

impl TimeoutConfig {
    /// Create a new timeout configuration with an overall timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            connect_timeout: None,
        }
    }

    /// Set the overall request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Get the overall request timeout
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get the connection timeout
    pub fn get_connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Check if any timeout is configured
    pub fn has_timeout(&self) -> bool {
        self.timeout.is_some() || self.connect_timeout.is_some()
    }

    /// Apply these timeouts to a reqwest client builder
    pub fn apply_to_builder(&self, mut builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_config_default() {
        let config = TimeoutConfig::default();
        assert!(!config.has_timeout());
        assert_eq!(config.get_timeout(), None);
        assert_eq!(config.get_connect_timeout(), None);
    }

    #[test]
    fn test_timeout_config_creation() {
        let config = TimeoutConfig::new(Duration::from_secs(30)).connect_timeout(Duration::from_secs(5));
        assert!(config.has_timeout());
        assert_eq!(config.get_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.get_connect_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_connect_timeout_only() {
        let config = TimeoutConfig::default().connect_timeout(Duration::from_millis(250));
        assert!(config.has_timeout());
        assert_eq!(config.get_timeout(), None);
    }
}
