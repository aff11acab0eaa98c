//! Frames that derive values from the request and attach them to its context.

use std::sync::Arc;

use http::header::AUTHORIZATION;
use tracing::error;

use crate::error::AuthError;
use crate::handler::{BoxFuture, BoxedService, Service};
use crate::request::Request;
use crate::writer::ResponseWriter;

use super::Middleware;

// ── CaptureIp ─────────────────────────────────────────────────────────────────

/// Records the caller's IP as `ip` on the request context, then delegates.
///
/// See [`Request::real_ip`] for how the address is chosen. A request with
/// neither a forwarded header nor a peer address passes through unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct CaptureIp;

impl Middleware for CaptureIp {
    fn wrap(&self, next: BoxedService) -> BoxedService {
        Arc::new(WithIp { next })
    }
}

struct WithIp {
    next: BoxedService,
}

impl Service for WithIp {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        let req = match req.real_ip() {
            Some(ip) => {
                let context = req.context().with_ip(ip);
                req.with_context(context)
            }
            None => req,
        };
        self.next.call(req, res)
    }
}

// ── CaptureAuth ───────────────────────────────────────────────────────────────

type OnInvalid = Arc<dyn Fn(&AuthError, &mut dyn ResponseWriter) + Send + Sync>;

/// Records the bearer token from `Authorization` as `auth_token` on the
/// request context, then delegates.
///
/// The header must be exactly `Bearer <token>`. When it is missing or has any
/// other shape the error is logged, `on_invalid` writes the response, and the
/// wrapped service is not called.
///
/// ```rust
/// use trellis::{StatusCode, write_json};
/// use trellis::middleware::CaptureAuth;
///
/// let auth = CaptureAuth::new(|_err, res| {
///     write_json(res, StatusCode::BAD_REQUEST, &serde_json::json!({ "error": "invalid JWT header!" }));
/// });
/// ```
#[derive(Clone)]
pub struct CaptureAuth {
    on_invalid: OnInvalid,
}

impl CaptureAuth {
    pub fn new<F>(on_invalid: F) -> Self
    where
        F: Fn(&AuthError, &mut dyn ResponseWriter) + Send + Sync + 'static,
    {
        Self { on_invalid: Arc::new(on_invalid) }
    }
}

impl Middleware for CaptureAuth {
    fn wrap(&self, next: BoxedService) -> BoxedService {
        Arc::new(WithAuth { on_invalid: Arc::clone(&self.on_invalid), next })
    }
}

struct WithAuth {
    on_invalid: OnInvalid,
    next: BoxedService,
}

impl Service for WithAuth {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        match bearer_token(&req) {
            Ok(token) => {
                let context = req.context().with_auth_token(token);
                self.next.call(req.with_context(context), res)
            }
            Err(err) => {
                error!(error = %err, path = req.path(), "rejected authorization header");
                (self.on_invalid)(&err, res);
                Box::pin(async {})
            }
        }
    }
}

fn bearer_token(req: &Request) -> Result<&str, AuthError> {
    let value = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::Missing)?
        .to_str()
        .map_err(|_| AuthError::Malformed)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        (Some(scheme), Some(_), None) if scheme != "Bearer" => {
            Err(AuthError::UnsupportedScheme(scheme.to_owned()))
        }
        _ => Err(AuthError::Malformed),
    }
}
