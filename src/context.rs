//! Per-request values derived by middleware.

use std::sync::Arc;

/// Values attached to a request by the middleware it passed through.
///
/// A context is never mutated in place. Each `with_*` call returns a new
/// snapshot, so a frame that kept the context it received still sees it
/// unchanged after an inner frame extended its own copy. Cloning is two
/// reference-count bumps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    ip: Option<Arc<str>>,
    auth_token: Option<Arc<str>>,
}

impl RequestContext {
    /// Caller IP recorded by [`CaptureIp`](crate::middleware::CaptureIp).
    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    /// Bearer token recorded by [`CaptureAuth`](crate::middleware::CaptureAuth).
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn with_ip(&self, ip: impl Into<Arc<str>>) -> Self {
        Self { ip: Some(ip.into()), ..self.clone() }
    }

    pub fn with_auth_token(&self, token: impl Into<Arc<str>>) -> Self {
        Self { auth_token: Some(token.into()), ..self.clone() }
    }
}
