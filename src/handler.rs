//! Handler trait, the [`Service`] trait, and type erasure.
//!
//! There are two layers of callable here.
//!
//! **Handlers** are what applications write: an `async fn` that takes a
//! [`Request`] and returns something that converts into a [`Response`].
//!
//! **Services** are what the middleware chain is made of: they receive the
//! request *and* the response sink, so a frame can set headers before the
//! inner service runs, observe what it writes, or answer on its own.
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ Endpoint::new("/", hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! HandlerService(handler)                          ← Service adapter
//!        ↓  stored as BoxedService = Arc<dyn Service>
//! service.call(req, &mut sink)                     ← at request time
//!        ↓
//! handler(req).await.into_response().write_to(sink)
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::writer::ResponseWriter;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub(crate) type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// The future returned by [`Service::call`]. It borrows the service and the
/// response sink for as long as the call runs.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Internal dispatch interface for handlers.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> HandlerFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure returning a future) with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
/// Types that need to write to the sink directly implement [`Service`]
/// instead.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Newtype wrapper bridging a concrete handler `F` to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> HandlerFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Service ───────────────────────────────────────────────────────────────────

/// Something that answers a request by writing to a response sink.
///
/// The terminal dispatcher, every middleware frame, and every endpoint are
/// services. Implementations hold only immutable configuration and the
/// services they wrap; all per-request state lives in the call.
pub trait Service: Send + Sync + 'static {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a>;
}

/// A shared, type-erased service. Cloning is one atomic increment.
pub type BoxedService = Arc<dyn Service>;

/// Adapts a [`Handler`] into a [`Service`] by writing its response to the sink.
pub(crate) struct HandlerService(pub(crate) BoxedHandler);

impl Service for HandlerService {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        Box::pin(async move {
            let response = self.0.call(req).await;
            response.write_to(res);
        })
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::request::test_request;
    use crate::writer::ResponseBuffer;

    async fn created(req: Request) -> Response {
        Response::builder()
            .status(StatusCode::CREATED)
            .header("location", &format!("{}/1", req.path()))
            .text("made")
    }

    #[tokio::test]
    async fn handler_service_writes_the_handler_response() {
        let service = HandlerService(created.into_boxed_handler());
        let mut buf = ResponseBuffer::new();
        service.call(test_request("POST", "/things", &[]), &mut buf).await;

        assert_eq!(buf.status(), StatusCode::CREATED);
        assert_eq!(buf.header("location"), Some("/things/1"));
        assert_eq!(buf.body(), b"made");
    }

    #[tokio::test]
    async fn closures_are_handlers() {
        let greeting = Arc::new(String::from("hi"));
        let handler = move |_req: Request| {
            let greeting = Arc::clone(&greeting);
            async move { greeting.to_string() }
        };

        let service = HandlerService(handler.into_boxed_handler());
        let mut buf = ResponseBuffer::new();
        service.call(test_request("GET", "/", &[]), &mut buf).await;
        assert_eq!(buf.body(), b"hi");
    }
}
