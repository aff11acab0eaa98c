//! Server configuration.

use std::time::Duration;

/// Where to listen and how long to wait on slow peers.
///
/// The defaults suit an API behind a reverse proxy: 30 s to read request
/// headers, 30 s for a handler to produce its response, and 60 s before a
/// connection with no request in flight is closed.
///
/// ```rust
/// use std::time::Duration;
/// use trellis::ServerConfig;
///
/// let config = ServerConfig::new("0.0.0.0:3000").write_timeout(Duration::from_secs(5));
/// ```
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
        }
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// How long a keep-alive connection may wait for its next request.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0:8080")
    }
}
