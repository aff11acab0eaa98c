//! CORS response headers.

use std::sync::Arc;

use http::{HeaderMap, HeaderValue};
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};

use crate::error::ConfigError;
use crate::handler::{BoxFuture, BoxedService, Service};
use crate::request::Request;
use crate::writer::ResponseWriter;

use super::Middleware;

const ALL_ORIGINS: &str = "*";
const COMMON_METHODS: &str = "POST, GET, OPTIONS, PUT, DELETE";
const COMMON_HEADERS: &str =
    "Accept, Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, Authorization";

/// Sets the three `Access-Control-Allow-*` headers on every response, then
/// delegates.
///
/// The values are fixed when the frame is built. There is no special path
/// for preflight requests: an `OPTIONS` request flows inward like any other.
///
/// ```rust
/// use trellis::middleware::AccessControl;
///
/// let open = AccessControl::default();
/// let strict = AccessControl::new("https://app.example.com", "GET, POST", "Authorization")
///     .expect("valid header values");
/// ```
#[derive(Clone, Debug)]
pub struct AccessControl {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl AccessControl {
    pub fn new(
        allow_origin: &str,
        allow_methods: &str,
        allow_headers: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            allow_origin: header_value("access-control-allow-origin", allow_origin)?,
            allow_methods: header_value("access-control-allow-methods", allow_methods)?,
            allow_headers: header_value("access-control-allow-headers", allow_headers)?,
        })
    }
}

/// Any origin, the common REST methods, and the usual request headers.
impl Default for AccessControl {
    fn default() -> Self {
        Self {
            allow_origin: HeaderValue::from_static(ALL_ORIGINS),
            allow_methods: HeaderValue::from_static(COMMON_METHODS),
            allow_headers: HeaderValue::from_static(COMMON_HEADERS),
        }
    }
}

impl AccessControl {
    /// Inserts the three headers into `headers`.
    pub(crate) fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::try_from(value)
        .map_err(|_| ConfigError::InvalidHeaderValue { name, value: value.to_owned() })
}

impl Middleware for AccessControl {
    fn wrap(&self, next: BoxedService) -> BoxedService {
        Arc::new(WithAccessControl { config: self.clone(), next })
    }
}

struct WithAccessControl {
    config: AccessControl,
    next: BoxedService,
}

impl Service for WithAccessControl {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        self.config.apply(res.headers());
        self.next.call(req, res)
    }
}
