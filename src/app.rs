//! Assembling a servable application.
//!
//! Three shapes are supported:
//!
//! | shape | routes added after yours |
//! |---|---|
//! | [`App::rest`] | none |
//! | [`App::web`] | `GET /static/{*path}` from the asset source |
//! | [`App::spa`] | the static route, then `/{*path}` and `/` serving the app shell |
//!
//! Every shape wraps the dispatcher in [`AccessControl`] first, so CORS
//! headers are on the sink before any other frame or handler runs. Frames
//! added with [`AppBuilder::with`] sit inside it, in the order added.

use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::{debug, info, warn};

use crate::assets::AssetSource;
use crate::endpoint::Endpoint;
use crate::error::ConfigError;
use crate::handler::{BoxFuture, BoxedService, Service};
use crate::middleware::{AccessControl, Middleware, MiddlewareChain};
use crate::request::Request;
use crate::response::{ContentType, Response};
use crate::router::Router;
use crate::writer::ResponseWriter;

enum Shape {
    Rest,
    Web(AssetSource),
    Spa(AssetSource),
}

impl Shape {
    fn name(&self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::Web(_) => "web",
            Self::Spa(_) => "spa",
        }
    }

    fn fallbacks(&self) -> Vec<Endpoint> {
        match self {
            Self::Rest => Vec::new(),
            Self::Web(assets) => vec![static_files(assets.clone())],
            Self::Spa(assets) => vec![
                static_files(assets.clone()),
                app_shell("/{*path}", assets.clone()),
                app_shell("/", assets.clone()),
            ],
        }
    }
}

/// A fully composed application: the middleware chain around the frozen
/// route table.
pub struct App {
    service: BoxedService,
    access_control: AccessControl,
}

impl App {
    /// An API server: your routes and nothing else.
    pub fn rest(router: Router) -> AppBuilder {
        AppBuilder::new(router, Shape::Rest)
    }

    /// A server-rendered site with static files under `/static/`.
    pub fn web(router: Router, assets: AssetSource) -> AppBuilder {
        AppBuilder::new(router, Shape::Web(assets))
    }

    /// A single-page application. Unknown extension-less paths get
    /// `index.html` so client-side routing works on reload.
    pub fn spa(router: Router, assets: AssetSource) -> AppBuilder {
        AppBuilder::new(router, Shape::Spa(assets))
    }

    /// The CORS values of the outermost frame. The server also puts them on
    /// the responses it writes itself, such as a timed-out request's `503`.
    pub(crate) fn access_control(&self) -> &AccessControl {
        &self.access_control
    }

    pub fn into_service(self) -> BoxedService {
        self.service
    }
}

impl Service for App {
    fn call<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        self.service.call(req, res)
    }
}

/// Startup-time configuration of an [`App`].
pub struct AppBuilder {
    router: Router,
    shape: Shape,
    access_control: AccessControl,
    middleware: MiddlewareChain,
}

impl AppBuilder {
    fn new(router: Router, shape: Shape) -> Self {
        Self {
            router,
            shape,
            access_control: AccessControl::default(),
            middleware: MiddlewareChain::new(),
        }
    }

    /// Replaces the default allow-everything CORS values.
    pub fn access_control(mut self, access_control: AccessControl) -> Self {
        self.access_control = access_control;
        self
    }

    /// Adds an application-wide frame inside the CORS frame.
    pub fn with(mut self, frame: impl Middleware) -> Self {
        self.middleware.register(frame);
        self
    }

    /// Orders the routes, checks them, and composes the chain.
    pub fn build(self) -> Result<App, ConfigError> {
        let dispatcher = self.router.build_with(self.shape.fallbacks())?;
        for (precedence, path) in dispatcher.paths().enumerate() {
            debug!(precedence, path, "route");
        }
        let routes = dispatcher.paths().count();

        let mut chain = MiddlewareChain::new().with(self.access_control.clone());
        chain.extend(&self.middleware);

        info!(shape = self.shape.name(), routes, frames = chain.len(), "application assembled");

        Ok(App {
            service: chain.build(Arc::new(dispatcher)),
            access_control: self.access_control,
        })
    }
}

// ── Built-in routes ──────────────────────────────────────────────────────────

fn not_found() -> Response {
    Response::builder().status(StatusCode::NOT_FOUND).text("Not found")
}

fn static_files(assets: AssetSource) -> Endpoint {
    let handler = move |req: Request| {
        let assets = assets.clone();
        async move {
            let path = format!("static/{}", req.param("path").unwrap_or_default());
            match assets.read(&path).await {
                Some(bytes) => Response::builder().bytes(ContentType::from_path(&path), bytes),
                None => not_found(),
            }
        }
    };
    Endpoint::new("/static/{*path}", handler).method(Method::GET)
}

fn app_shell(pattern: &str, assets: AssetSource) -> Endpoint {
    let handler = move |req: Request| {
        let assets = assets.clone();
        async move {
            let path = req.path();
            let (file, content_type) = if path.contains("/main.js") {
                ("main.js", ContentType::Javascript)
            } else if path.contains("/manifest.json") {
                ("manifest.json", ContentType::Json)
            } else if path.contains('.') {
                return not_found();
            } else {
                ("index.html", ContentType::Html)
            };

            match assets.read(file).await {
                Some(bytes) => Response::builder().bytes(content_type, bytes),
                None => {
                    warn!(file, "app shell file is missing from the asset source");
                    not_found()
                }
            }
        }
    };
    Endpoint::new(pattern, handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::test_request;
    use crate::writer::ResponseBuffer;

    async fn ping(_req: Request) -> Response {
        Response::text("pong")
    }

    fn shell_assets() -> AssetSource {
        AssetSource::bundle([
            ("index.html", &b"<html>app</html>"[..]),
            ("main.js", &b"console.log(1)"[..]),
            ("manifest.json", &b"{}"[..]),
            ("static/site.css", &b"body{}"[..]),
        ])
    }

    async fn get(app: &App, uri: &str) -> ResponseBuffer {
        let mut buf = ResponseBuffer::new();
        app.call(test_request("GET", uri, &[]), &mut buf).await;
        buf
    }

    #[tokio::test]
    async fn rest_app_sets_cors_headers_on_every_response() {
        let app = App::rest(Router::new().on(Method::GET, "/ping", ping)).build().unwrap();

        for uri in ["/ping", "/missing"] {
            let buf = get(&app, uri).await;
            assert_eq!(buf.header("access-control-allow-origin"), Some("*"), "{uri}");
        }
        assert_eq!(get(&app, "/ping").await.body(), b"pong");
        assert_eq!(get(&app, "/missing").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn web_app_serves_static_files() {
        let app = App::web(Router::new(), shell_assets()).build().unwrap();

        let buf = get(&app, "/static/site.css").await;
        assert_eq!(buf.status(), StatusCode::OK);
        assert_eq!(buf.header("content-type"), Some("text/css"));
        assert_eq!(buf.body(), b"body{}");

        assert_eq!(get(&app, "/static/nope.css").await.status(), StatusCode::NOT_FOUND);
        // no app shell in this shape
        assert_eq!(get(&app, "/dashboard").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn spa_serves_the_shell_for_client_routes() {
        let app = App::spa(Router::new().on(Method::GET, "/api/ping", ping), shell_assets())
            .build()
            .unwrap();

        for uri in ["/", "/dashboard", "/users/42/settings"] {
            let buf = get(&app, uri).await;
            assert_eq!(buf.header("content-type"), Some("text/html"), "{uri}");
            assert_eq!(buf.body(), b"<html>app</html>", "{uri}");
        }

        let js = get(&app, "/deep/link/main.js").await;
        assert_eq!(js.header("content-type"), Some("text/javascript"));
        assert_eq!(js.body(), b"console.log(1)");

        let manifest = get(&app, "/manifest.json").await;
        assert_eq!(manifest.header("content-type"), Some("application/json"));

        let missing = get(&app, "/favicon.ico").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.body(), b"Not found");

        assert_eq!(get(&app, "/api/ping").await.body(), b"pong");
        assert_eq!(get(&app, "/static/site.css").await.body(), b"body{}");
    }

    #[test]
    fn spa_rejects_a_user_route_on_the_root() {
        let result = App::spa(Router::new().on(Method::GET, "/", ping), shell_assets()).build();
        assert!(matches!(result, Err(ConfigError::DuplicateRoute { .. })));
    }

    #[tokio::test]
    async fn custom_access_control_values_are_used() {
        let cors = AccessControl::new("https://example.com", "GET", "Accept").unwrap();
        let app = App::rest(Router::new().on(Method::GET, "/ping", ping))
            .access_control(cors)
            .build()
            .unwrap();

        let buf = get(&app, "/ping").await;
        assert_eq!(buf.header("access-control-allow-origin"), Some("https://example.com"));
        assert_eq!(buf.header("access-control-allow-methods"), Some("GET"));
    }
}
