//! Status observation layered over any response sink.

use http::{HeaderMap, StatusCode};

use crate::writer::ResponseWriter;

/// Wraps a sink and remembers the statuses written through it.
///
/// Every call is forwarded unchanged; the recorder only watches. It is itself
/// a [`ResponseWriter`], so recorders (or other observers) stack freely.
///
/// Two views are kept. [`status`](Self::status) is the last status a frame
/// asked for. [`sent_status`](Self::sent_status) is the one a committing sink
/// such as [`ResponseBuffer`](crate::ResponseBuffer) puts on the wire: the
/// first `write_status`, or `200` if the body was written first. They only
/// differ when something writes a status after the response is committed.
pub struct StatusRecorder<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: StatusCode,
    sent: Option<StatusCode>,
}

impl<'a> StatusRecorder<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        Self { inner, status: StatusCode::OK, sent: None }
    }

    /// `200` unless a status was written, then the last one written.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The status that committed the response, `200` if nothing did.
    pub fn sent_status(&self) -> StatusCode {
        self.sent.unwrap_or(StatusCode::OK)
    }
}

impl ResponseWriter for StatusRecorder<'_> {
    fn headers(&mut self) -> &mut HeaderMap {
        self.inner.headers()
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status = status;
        self.sent.get_or_insert(status);
        self.inner.write_status(status);
    }

    fn write(&mut self, chunk: &[u8]) {
        self.sent.get_or_insert(StatusCode::OK);
        self.inner.write(chunk);
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;
    use crate::writer::ResponseBuffer;

    #[test]
    fn defaults_to_ok_when_only_a_body_is_written() {
        let mut buf = ResponseBuffer::new();
        let mut recorder = StatusRecorder::new(&mut buf);
        recorder.write(b"fine");
        assert_eq!(recorder.status(), StatusCode::OK);
    }

    #[test]
    fn records_an_explicit_status_regardless_of_later_body() {
        let mut buf = ResponseBuffer::new();
        let mut recorder = StatusRecorder::new(&mut buf);
        recorder.write_status(StatusCode::NOT_FOUND);
        recorder.write(b"nothing here");
        assert_eq!(recorder.status(), StatusCode::NOT_FOUND);

        assert_eq!(buf.status(), StatusCode::NOT_FOUND);
        assert_eq!(buf.body(), b"nothing here");
    }

    #[test]
    fn late_status_is_recorded_but_not_sent() {
        let mut buf = ResponseBuffer::new();
        let mut recorder = StatusRecorder::new(&mut buf);
        recorder.write_status(StatusCode::NOT_FOUND);
        recorder.write_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(recorder.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(recorder.sent_status(), StatusCode::NOT_FOUND);
        assert_eq!(buf.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn body_first_commits_ok() {
        let mut buf = ResponseBuffer::new();
        let mut recorder = StatusRecorder::new(&mut buf);
        recorder.write(b"early");
        recorder.write_status(StatusCode::CREATED);
        assert_eq!(recorder.status(), StatusCode::CREATED);
        assert_eq!(recorder.sent_status(), StatusCode::OK);
        assert_eq!(buf.status(), StatusCode::OK);
    }

    #[test]
    fn passes_headers_through() {
        let mut buf = ResponseBuffer::new();
        let mut recorder = StatusRecorder::new(&mut buf);
        recorder.headers().insert("x-trace", HeaderValue::from_static("on"));
        recorder.write_status(StatusCode::CREATED);
        assert_eq!(buf.header("x-trace"), Some("on"));
    }

    #[test]
    fn recorders_stack() {
        let mut buf = ResponseBuffer::new();
        let mut outer = StatusRecorder::new(&mut buf);
        {
            let mut inner = StatusRecorder::new(&mut outer);
            inner.write_status(StatusCode::ACCEPTED);
            assert_eq!(inner.status(), StatusCode::ACCEPTED);
        }
        assert_eq!(outer.status(), StatusCode::ACCEPTED);
    }
}
