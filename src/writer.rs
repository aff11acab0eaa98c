//! The response sink handed down the middleware chain.
//!
//! Middleware and handlers never build the final `http::Response` directly.
//! They write to a [`ResponseWriter`], which lets outer frames set headers
//! before the inner handler runs and lets observers (see
//! [`StatusRecorder`](crate::StatusRecorder)) wrap the sink without the
//! handler knowing.
//!
//! The write model follows the usual server convention:
//!
//! ```text
//! headers().insert(..)   ← freely, until the response is committed
//! write_status(code)     ← commits status + headers; later calls are ignored
//! write(bytes)           ← commits with 200 if nothing was committed yet
//! ```

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::warn;

/// A sink for one HTTP response.
///
/// `Send` is a supertrait so `&mut dyn ResponseWriter` can be held across
/// `.await` points inside the boxed futures of the chain.
pub trait ResponseWriter: Send {
    /// The header map that will be sent with the response. Changes made
    /// after the response is committed are not sent.
    fn headers(&mut self) -> &mut HeaderMap;

    /// Sets the status code and commits the headers.
    fn write_status(&mut self, status: StatusCode);

    /// Appends body bytes, committing with `200 OK` if needed.
    fn write(&mut self, chunk: &[u8]);
}

/// The in-memory sink used by the server for every request.
///
/// Also handy in tests: run a service against a fresh buffer, then inspect
/// [`status`](Self::status), [`header`](Self::header) and [`body`](Self::body).
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    headers: HeaderMap,
    committed: Option<(StatusCode, HeaderMap)>,
    body: BytesMut,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn commit(&mut self, status: StatusCode) {
        if self.committed.is_none() {
            self.committed = Some((status, self.headers.clone()));
        }
    }

    /// The status that will be sent. `200` if nothing was written.
    pub fn status(&self) -> StatusCode {
        self.committed.as_ref().map_or(StatusCode::OK, |(status, _)| *status)
    }

    /// A header as it will be sent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.sent_headers().get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// True once a status or body byte has been written.
    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    fn sent_headers(&self) -> &HeaderMap {
        self.committed.as_ref().map_or(&self.headers, |(_, headers)| headers)
    }

    /// Converts the buffered response into what hyper sends on the wire.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let (status, headers) = self.committed.unwrap_or((StatusCode::OK, self.headers));
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

impl ResponseWriter for ResponseBuffer {
    fn headers(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        if let Some((sent, _)) = &self.committed {
            warn!(sent = %sent, ignored = %status, "superfluous write_status call");
            return;
        }
        self.commit(status);
    }

    fn write(&mut self, chunk: &[u8]) {
        self.commit(StatusCode::OK);
        self.body.extend_from_slice(chunk);
    }
}
