//! Endpoint declarations and their precedence order.
//!
//! The dispatcher tries endpoints one after another and stops at the first
//! match, so the order decides which of two overlapping patterns wins.
//! [`order`] puts the more specific pattern first:
//!
//! 1. static paths before paths with a `{placeholder}`
//! 2. within each group, longer paths before shorter ones
//! 3. remaining ties by byte-wise path comparison
//!
//! ```text
//! /users/active          static, 13 bytes
//! /users                 static,  6 bytes
//! /users/{id}/posts      dynamic, 17 bytes
//! /users/{id}            dynamic, 11 bytes
//! ```
//!
//! Two endpoints with the same path are rejected, whatever their methods.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::error::ConfigError;
use crate::handler::{BoxedService, Handler, HandlerService, Service};
use crate::middleware::{Middleware, MiddlewareChain};

/// A route registration: a path pattern, the methods it answers, and the
/// service that answers them.
///
/// ```rust
/// use trellis::{Endpoint, Method, Request, Response};
/// use trellis::middleware::MethodGuard;
///
/// async fn get_user(req: Request) -> Response {
///     Response::text(req.param("id").unwrap_or("unknown").to_owned())
/// }
/// # async fn create_user(_: Request) -> Response { Response::text("") }
///
/// let by_id = Endpoint::new("/users/{id}", get_user).method(Method::GET);
/// let create = Endpoint::new("/users", create_user).with(MethodGuard::new(Method::POST));
/// ```
pub struct Endpoint {
    path: String,
    methods: Vec<Method>,
    service: BoxedService,
    middleware: MiddlewareChain,
}

impl Endpoint {
    /// An endpoint answering any method with `handler`.
    pub fn new(path: impl Into<String>, handler: impl Handler) -> Self {
        Self::from_service(path, HandlerService(handler.into_boxed_handler()))
    }

    /// An endpoint backed by a service that writes to the sink itself.
    pub fn from_service(path: impl Into<String>, service: impl Service) -> Self {
        Self {
            path: path.into(),
            methods: Vec::new(),
            service: Arc::new(service),
            middleware: MiddlewareChain::new(),
        }
    }

    /// Adds an allowed method. With none added, every method is allowed.
    pub fn method(mut self, method: Method) -> Self {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self
    }

    pub fn methods(self, methods: impl IntoIterator<Item = Method>) -> Self {
        methods.into_iter().fold(self, Self::method)
    }

    /// Wraps this endpoint's service in `frame`. Frames added first run
    /// outermost, like the application chain.
    pub fn with(mut self, frame: impl Middleware) -> Self {
        self.middleware.register(frame);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn allowed_methods(&self) -> &[Method] {
        &self.methods
    }

    /// True when the path contains a `{placeholder}` or `{*catch_all}`.
    pub fn is_dynamic(&self) -> bool {
        is_dynamic(&self.path)
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Method>, BoxedService) {
        let service = self.middleware.build(self.service);
        (self.path, self.methods, service)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

fn is_dynamic(path: &str) -> bool {
    path.contains('{') && path.contains('}')
}

/// Total precedence order on path patterns. `Less` means "try first".
fn precedence(a: &str, b: &str) -> Ordering {
    is_dynamic(a)
        .cmp(&is_dynamic(b))
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| a.cmp(b))
}

/// Sorts endpoints into dispatch order.
///
/// Fails with [`ConfigError::DuplicateRoute`] if two endpoints share a path.
/// The order is total, so equal paths end up adjacent and one pass finds
/// any duplicate.
pub fn order(mut endpoints: Vec<Endpoint>) -> Result<Vec<Endpoint>, ConfigError> {
    endpoints.sort_by(|a, b| precedence(&a.path, &b.path));

    if let Some(pair) = endpoints.windows(2).find(|pair| pair[0].path == pair[1].path) {
        return Err(ConfigError::DuplicateRoute { path: pair[0].path.clone() });
    }

    Ok(endpoints)
}
