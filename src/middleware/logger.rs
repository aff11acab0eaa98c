//! Per-request access log.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::handler::{BoxFuture, BoxedService, Service};
use crate::recorder::StatusRecorder;
use crate::request::Request;
use crate::writer::ResponseWriter;

use super::Middleware;

/// Emits one `info` event per request after the inner service returns.
///
/// The event message is the request path; fields carry the caller IP, the
/// method, the status the client receives (see
/// [`StatusRecorder::sent_status`]), the elapsed time, and the raw query
/// string.
///
/// Register it early so the elapsed time covers the frames inside it.
///
/// A request cut off by the server's write timeout never reaches the end of
/// this frame, so it gets no access-log line; the server logs a warning for
/// it instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestLogger;

impl Middleware for RequestLogger {
    fn wrap(&self, next: BoxedService) -> BoxedService {
        Arc::new(Logged { next })
    }
}

struct Logged {
    next: BoxedService,
}

impl Service for Logged {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        let ip = req.real_ip().unwrap_or_else(|| "-".to_owned());
        let method = req.method().clone();
        let path = req.path().to_owned();
        let query = req.query().to_owned();

        Box::pin(async move {
            let started = Instant::now();
            let mut recorder = StatusRecorder::new(res);
            self.next.call(req, &mut recorder).await;
            let status = recorder.sent_status();

            info!(
                ip = %ip,
                method = %method,
                status = status.as_u16(),
                execution_time = ?started.elapsed(),
                query_params = %query,
                "{path}"
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use http::StatusCode;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::request::test_request;
    use crate::writer::ResponseBuffer;

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes).lines().map(str::to_owned).collect()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (captured, guard)
    }

    /// Writes 404, then tries to change its mind.
    struct Undecided;

    impl Service for Undecided {
        fn call<'a>(&'a self, _req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
            Box::pin(async move {
                res.write_status(StatusCode::NOT_FOUND);
                res.write_status(StatusCode::INTERNAL_SERVER_ERROR);
            })
        }
    }

    struct Teapot;

    impl Service for Teapot {
        fn call<'a>(&'a self, _req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
            Box::pin(async move {
                res.write_status(StatusCode::IM_A_TEAPOT);
                res.write(b"short and stout");
            })
        }
    }

    #[tokio::test]
    async fn logging_does_not_alter_the_response() {
        let service = RequestLogger.wrap(Arc::new(Teapot));
        let mut buf = ResponseBuffer::new();
        service.call(test_request("GET", "/pot?size=small", &[]), &mut buf).await;

        assert_eq!(buf.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(buf.body(), b"short and stout");
    }

    #[tokio::test]
    async fn one_event_with_every_field() {
        let (captured, _guard) = capture();

        let service = RequestLogger.wrap(Arc::new(Teapot));
        let mut buf = ResponseBuffer::new();
        service.call(test_request("GET", "/pot?size=small", &[]), &mut buf).await;

        let lines: Vec<_> =
            captured.lines().into_iter().filter(|line| line.contains("/pot")).collect();
        assert_eq!(lines.len(), 1, "{lines:?}");

        let line = &lines[0];
        assert!(line.contains("INFO"), "{line}");
        assert!(line.contains("ip=127.0.0.1"), "{line}");
        assert!(line.contains("method=GET"), "{line}");
        assert!(line.contains("status=418"), "{line}");
        assert!(line.contains("execution_time="), "{line}");
        assert!(line.contains("query_params=size=small"), "{line}");
    }

    #[tokio::test]
    async fn logs_the_status_the_client_gets() {
        let (captured, _guard) = capture();

        let service = RequestLogger.wrap(Arc::new(Undecided));
        let mut buf = ResponseBuffer::new();
        service.call(test_request("GET", "/maybe", &[]), &mut buf).await;

        assert_eq!(buf.status(), StatusCode::NOT_FOUND);
        let line = captured
            .lines()
            .into_iter()
            .find(|line| line.contains("/maybe"))
            .expect("access log line");
        assert!(line.contains("status=404"), "{line}");
    }
}
