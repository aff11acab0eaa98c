use std::sync::Arc;

use crate::handler::BoxedService;

use super::{BoxedMiddleware, Middleware};

/// An ordered list of middleware frames, outermost first.
///
/// Register frames during startup, then call [`build`](Self::build) once.
/// The composed service is immutable and shared by every request.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    frames: Vec<BoxedMiddleware>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Appends a frame. It runs inside every frame registered before it.
    pub fn register(&mut self, frame: impl Middleware) {
        self.frames.push(Arc::new(frame));
    }

    /// Chaining form of [`register`](Self::register).
    pub fn with(mut self, frame: impl Middleware) -> Self {
        self.register(frame);
        self
    }

    /// Appends every frame of `other`, keeping their order.
    pub fn extend(&mut self, other: &MiddlewareChain) {
        self.frames.extend(other.frames.iter().cloned());
    }

    /// Composes all frames around `terminal`.
    ///
    /// Wrapping runs from the last frame to the first, which leaves the first
    /// registered frame outermost.
    pub fn build(&self, terminal: BoxedService) -> BoxedService {
        self.frames.iter().rev().fold(terminal, |inner, frame| frame.wrap(inner))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::StatusCode;

    use super::*;
    use crate::handler::{BoxFuture, Service};
    use crate::request::{Request, test_request};
    use crate::writer::{ResponseBuffer, ResponseWriter};

    type Trail = Arc<Mutex<Vec<String>>>;

    /// Records entry and exit, then delegates.
    struct Mark {
        name: &'static str,
        trail: Trail,
        next: BoxedService,
    }

    impl Service for Mark {
        fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
            Box::pin(async move {
                self.trail.lock().unwrap().push(format!("{} in", self.name));
                self.next.call(req, res).await;
                self.trail.lock().unwrap().push(format!("{} out", self.name));
            })
        }
    }

    /// Answers on its own without delegating.
    struct Halt {
        trail: Trail,
    }

    impl Service for Halt {
        fn call<'a>(&'a self, _req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
            Box::pin(async move {
                self.trail.lock().unwrap().push("halt".to_owned());
                res.write_status(StatusCode::FORBIDDEN);
            })
        }
    }

    struct Terminal {
        trail: Trail,
    }

    impl Service for Terminal {
        fn call<'a>(&'a self, _req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
            Box::pin(async move {
                self.trail.lock().unwrap().push("terminal".to_owned());
                res.write(b"done");
            })
        }
    }

    fn mark(name: &'static str, trail: &Trail) -> impl Middleware {
        let trail = Arc::clone(trail);
        move |next: BoxedService| -> BoxedService {
            Arc::new(Mark { name, trail: Arc::clone(&trail), next })
        }
    }

    #[tokio::test]
    async fn first_registered_frame_is_outermost() {
        let trail = Trail::default();
        let chain = MiddlewareChain::new()
            .with(mark("a", &trail))
            .with(mark("b", &trail))
            .with(mark("c", &trail));

        let service = chain.build(Arc::new(Terminal { trail: Arc::clone(&trail) }));
        let mut buf = ResponseBuffer::new();
        service.call(test_request("GET", "/", &[]), &mut buf).await;

        assert_eq!(
            *trail.lock().unwrap(),
            ["a in", "b in", "c in", "terminal", "c out", "b out", "a out"]
        );
        assert_eq!(buf.body(), b"done");
    }

    #[tokio::test]
    async fn a_frame_that_does_not_delegate_halts_the_chain() {
        let trail = Trail::default();
        let halt_trail = Arc::clone(&trail);
        let chain = MiddlewareChain::new()
            .with(mark("outer", &trail))
            .with(move |_next: BoxedService| -> BoxedService {
                Arc::new(Halt { trail: Arc::clone(&halt_trail) })
            })
            .with(mark("inner", &trail));

        let service = chain.build(Arc::new(Terminal { trail: Arc::clone(&trail) }));
        let mut buf = ResponseBuffer::new();
        service.call(test_request("GET", "/", &[]), &mut buf).await;

        assert_eq!(*trail.lock().unwrap(), ["outer in", "halt", "outer out"]);
        assert_eq!(buf.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn empty_chain_is_the_terminal() {
        let trail = Trail::default();
        let chain = MiddlewareChain::new();
        assert!(chain.is_empty());

        let service = chain.build(Arc::new(Terminal { trail: Arc::clone(&trail) }));
        let mut buf = ResponseBuffer::new();
        service.call(test_request("GET", "/", &[]), &mut buf).await;
        assert_eq!(*trail.lock().unwrap(), ["terminal"]);
    }

    #[tokio::test]
    async fn extend_appends_in_order() {
        let trail = Trail::default();
        let mut chain = MiddlewareChain::new().with(mark("app", &trail));
        chain.extend(&MiddlewareChain::new().with(mark("route", &trail)));
        assert_eq!(chain.len(), 2);

        let service = chain.build(Arc::new(Terminal { trail: Arc::clone(&trail) }));
        let mut buf = ResponseBuffer::new();
        service.call(test_request("GET", "/", &[]), &mut buf).await;
        assert_eq!(trail.lock().unwrap()[..2], ["app in", "route in"]);
    }
}
