//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Handlers build a [`Response`] and return it; the endpoint adapter writes
//! it to the request's [`ResponseWriter`]. Services that need finer control
//! write to the sink directly.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use tracing::{error, warn};

use crate::writer::ResponseWriter;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Css,          // text/css
    Csv,          // text/csv
    Html,         // text/html
    Ico,          // image/x-icon
    Javascript,   // text/javascript
    Jpeg,         // image/jpeg
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / file download)
    Png,          // image/png
    Svg,          // image/svg+xml
    Text,         // text/plain
    Wasm,         // application/wasm
    Woff2,        // font/woff2
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Css         => "text/css",
            Self::Csv         => "text/csv",
            Self::Html        => "text/html",
            Self::Ico         => "image/x-icon",
            Self::Javascript  => "text/javascript",
            Self::Jpeg        => "image/jpeg",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain",
            Self::Wasm        => "application/wasm",
            Self::Woff2       => "font/woff2",
            Self::Xml         => "application/xml",
        }
    }

    /// Guesses a content type from a file name's extension.
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("css")                => Self::Css,
            Some("csv")                => Self::Csv,
            Some("htm" | "html")       => Self::Html,
            Some("ico")                => Self::Ico,
            Some("js" | "mjs")         => Self::Javascript,
            Some("jpg" | "jpeg")       => Self::Jpeg,
            Some("json" | "map")       => Self::Json,
            Some("png")                => Self::Png,
            Some("svg")                => Self::Svg,
            Some("txt")                => Self::Text,
            Some("wasm")               => Self::Wasm,
            Some("woff2")              => Self::Woff2,
            Some("xml")                => Self::Xml,
            _                          => Self::OctetStream,
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use trellis::{Response, StatusCode};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// `200 OK` — `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().bytes(ContentType::Json, body)
    }

    /// `200 OK` — `text/plain`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: StatusCode::OK, headers: HeaderMap::new() }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Writes headers, status and body to `res`, in that order.
    ///
    /// Headers already present on the sink (e.g. CORS headers set by an outer
    /// frame) are kept unless this response sets the same name.
    pub fn write_to(self, res: &mut dyn ResponseWriter) {
        let headers = res.headers();
        let mut last_name: Option<HeaderName> = None;
        for (name, value) in self.headers {
            // `HeaderMap::into_iter` yields `None` for repeated values of the
            // previous name.
            match name {
                Some(name) => {
                    headers.insert(name.clone(), value);
                    last_name = Some(name);
                }
                None => {
                    if let Some(name) = &last_name {
                        headers.append(name.clone(), value);
                    }
                }
            }
        }
        res.write_status(self.status);
        if !self.body.is_empty() {
            res.write(&self.body);
        }
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Terminated by a
/// typed body method.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderMap,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    /// Adds a header. Names or values that are not valid HTTP are dropped
    /// with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!(header = name, "dropping invalid response header"),
        }
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.bytes(ContentType::Json, body)
    }

    /// Terminate with a plain-text body (`text/plain`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.bytes(ContentType::Text, body.into())
    }

    /// Terminate with a typed body.
    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        let mut headers = self.headers;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
        Response { status: self.status, headers, body: body.into() }
    }

    /// Terminate with no body.
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Bytes::new() }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a [`StatusCode`] directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

impl<R: IntoResponse> IntoResponse for (StatusCode, R) {
    fn into_response(self) -> Response {
        let mut response = self.1.into_response();
        response.status = self.0;
        response
    }
}

/// Serializes `T` as the JSON body of a `200 OK`.
///
/// ```rust
/// use trellis::{Json, Request, StatusCode};
///
/// #[derive(serde::Serialize)]
/// struct User { id: u64, name: String }
///
/// async fn get_user(_req: Request) -> Json<User> {
///     Json(User { id: 1, name: "alice".into() })
/// }
///
/// async fn create_user(_req: Request) -> (StatusCode, Json<User>) {
///     (StatusCode::CREATED, Json(User { id: 2, name: "bob".into() }))
/// }
/// ```
///
/// A value that fails to serialize becomes a `500` carrying the fallback
/// payload described in [`write_json`](crate::write_json); the cause is logged.
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => Response::json(bytes),
            Err(e) => {
                error!(error = %e, "error marshaling value for writing");
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .json(serialization_fallback())
            }
        }
    }
}

/// Body sent in place of a value that could not be serialized.
#[derive(Serialize)]
struct SerializationFailure {
    message: &'static str,
    suggestion: &'static str,
}

pub(crate) fn serialization_fallback() -> Vec<u8> {
    let failure = SerializationFailure {
        message: "Error marshaling value for writing",
        suggestion: "See error log for more information",
    };
    // Two static strings always serialize.
    serde_json::to_vec(&failure).unwrap_or_default()
}
