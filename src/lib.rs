//! # trellis
//!
//! Ordered routing and composable middleware for small HTTP services and
//! single-page apps.
//!
//! ## The model
//!
//! Startup does all the deciding. Routes are declared, sorted into a fixed
//! precedence order, and checked for duplicates once; the middleware chain
//! is composed once around the resulting dispatcher. After that everything
//! is immutable and shared by every request.
//!
//! ```text
//! request ─▶ AccessControl ─▶ your frames … ─▶ Dispatcher ─▶ endpoint frames ─▶ handler
//!                 │                                 │
//!            CORS headers                 first route whose pattern
//!                                         and method both match
//! ```
//!
//! - Route precedence — static before dynamic, longer before shorter,
//!   then lexicographic; duplicates are a startup error
//! - Middleware — outer-first [`MiddlewareChain`](middleware::MiddlewareChain);
//!   each frame delegates inward or answers on its own
//! - Response sink — frames write through [`ResponseWriter`]; observers such
//!   as [`StatusRecorder`] layer over it without the handler knowing
//! - Request context — typed [`RequestContext`] snapshots carry the caller
//!   IP and bearer token downstream
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use trellis::middleware::{CaptureIp, RequestLogger};
//! use trellis::{App, Json, Method, Request, Response, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), trellis::Error> {
//!     let router = Router::new()
//!         .on(Method::GET,  "/users/{id}",   get_user)
//!         .on(Method::GET,  "/users/active", active_users)
//!         .on(Method::POST, "/users",        create_user);
//!
//!     let app = App::rest(router)
//!         .with(RequestLogger)
//!         .with(CaptureIp)
//!         .build()?;
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn active_users(_req: Request) -> Json<Vec<u64>> {
//!     Json(vec![1, 2, 3])
//! }
//!
//! async fn create_user(req: Request) -> StatusCode {
//!     if req.body().is_empty() {
//!         return StatusCode::BAD_REQUEST;
//!     }
//!     StatusCode::CREATED
//! }
//! ```

mod app;
mod assets;
mod config;
mod context;
mod endpoint;
mod error;
mod handler;
mod json;
mod recorder;
mod request;
mod response;
mod router;
mod server;
mod writer;

pub mod middleware;
pub mod paging;

pub use app::{App, AppBuilder};
pub use assets::{AssetSource, DEVELOPMENT};
pub use config::ServerConfig;
pub use context::RequestContext;
pub use endpoint::{Endpoint, order};
pub use error::{AuthError, BodyError, ConfigError, Error, MethodNotAllowed};
pub use handler::{BoxFuture, BoxedService, Handler, Service};
pub use http::{Method, StatusCode};
pub use json::{read_json_body, write_json, write_string};
pub use middleware::validate_method;
pub use recorder::StatusRecorder;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Json, Response, ResponseBuilder};
pub use router::{Dispatcher, Router};
pub use server::{Server, shutdown_signal};
pub use writer::{ResponseBuffer, ResponseWriter};
