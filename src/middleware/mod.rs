//! Middleware layer.
//!
//! A middleware frame is a transform from one [`Service`] into another. A
//! [`MiddlewareChain`] holds frames in registration order and composes them
//! around a terminal service once, at startup:
//!
//! ```text
//! chain.register(A); chain.register(B); chain.build(dispatch)
//!
//!   request ──▶ A ──▶ B ──▶ dispatch
//!   response ◀── A ◀── B ◀──┘
//! ```
//!
//! The first registered frame is the outermost: it sees the request before
//! every other frame and regains control after all of them have returned.
//! A frame either delegates to the service it wraps or answers on its own by
//! writing to the sink and returning.
//!
//! Built-in frames:
//! - [`AccessControl`] — CORS response headers
//! - [`MethodGuard`] — one allowed method per handler, 405 otherwise
//! - [`CaptureIp`] — caller IP into the request context
//! - [`CaptureAuth`] — bearer token into the request context
//! - [`RequestLogger`] — one log line per request with the final status

mod access_control;
mod allow;
mod capture;
mod chain;
mod logger;

use std::sync::Arc;

pub use access_control::AccessControl;
pub use allow::{MethodGuard, validate_method};
pub use capture::{CaptureAuth, CaptureIp};
pub use chain::MiddlewareChain;
pub use logger::RequestLogger;

use crate::handler::BoxedService;

/// A transform from one service into another.
///
/// Implemented for the built-in frames and for any
/// `Fn(BoxedService) -> BoxedService` closure.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedService) -> BoxedService;
}

impl<F> Middleware for F
where
    F: Fn(BoxedService) -> BoxedService + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedService) -> BoxedService {
        self(next)
    }
}

/// A shared, type-erased middleware frame.
pub type BoxedMiddleware = Arc<dyn Middleware>;
