//! Single-method enforcement.

use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, StatusCode};
use serde::Serialize;

use crate::error::MethodNotAllowed;
use crate::handler::{BoxFuture, BoxedService, Service};
use crate::json::write_json;
use crate::request::Request;
use crate::writer::ResponseWriter;

use super::Middleware;

/// Lets exactly one method through to the wrapped service.
///
/// The comparison ignores case, so a `post` request passes a guard built for
/// [`Method::POST`]. Anything else is answered here:
///
/// | request | response | inner service |
/// |---|---|---|
/// | allowed method | whatever the inner service writes | called once |
/// | `OPTIONS` | nothing written | not called |
/// | any other method | `405`, `text/plain`, `method not allowed` | not called |
///
/// The silent `OPTIONS` answer pairs with [`AccessControl`](super::AccessControl)
/// further out, which has already set the CORS headers a preflight needs.
#[derive(Clone, Debug)]
pub struct MethodGuard {
    allowed: Method,
}

impl MethodGuard {
    pub fn new(allowed: Method) -> Self {
        Self { allowed }
    }
}

impl Middleware for MethodGuard {
    fn wrap(&self, next: BoxedService) -> BoxedService {
        Arc::new(Guarded { allowed: self.allowed.clone(), next })
    }
}

struct Guarded {
    allowed: Method,
    next: BoxedService,
}

impl Service for Guarded {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        let method = req.method().as_str();

        if method.eq_ignore_ascii_case(self.allowed.as_str()) {
            return self.next.call(req, res);
        }

        if !method.eq_ignore_ascii_case(Method::OPTIONS.as_str()) {
            res.headers().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            res.write_status(StatusCode::METHOD_NOT_ALLOWED);
            res.write(b"method not allowed");
        }

        Box::pin(async {})
    }
}

#[derive(Serialize)]
struct MethodNotAllowedBody {
    message: &'static str,
}

/// Checks the request method inside a handler.
///
/// On mismatch a JSON `405` (`{"message":"method not allowed"}`) is written to
/// `res` and an error is returned so the caller can stop. Unlike
/// [`MethodGuard`] the comparison is exact.
pub fn validate_method(
    req: &Request,
    res: &mut dyn ResponseWriter,
    expected: &Method,
) -> Result<(), MethodNotAllowed> {
    if req.method() == expected {
        return Ok(());
    }

    write_json(
        res,
        StatusCode::METHOD_NOT_ALLOWED,
        &MethodNotAllowedBody { message: "method not allowed" },
    );

    Err(MethodNotAllowed { method: req.method().clone(), expected: expected.clone() })
}
