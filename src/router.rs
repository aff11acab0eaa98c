//! Route registration and the terminal dispatcher.
//!
//! [`Router`] collects endpoints during startup. [`Router::build`] orders them
//! (see [`order`](crate::endpoint::order)), compiles one matcher per pattern,
//! and freezes the result into a [`Dispatcher`], the service at the centre of
//! the middleware chain.

use std::collections::{HashMap, HashSet};

use http::{Method, StatusCode};
use matchit::Router as Matcher;
use tracing::debug;

use crate::endpoint::{Endpoint, order};
use crate::error::ConfigError;
use crate::handler::{BoxFuture, BoxedService, Handler, Service};
use crate::json::write_string;
use crate::request::Request;
use crate::writer::ResponseWriter;

/// The application router.
///
/// Each registration call returns `self` so they chain naturally:
///
/// ```rust
/// # use trellis::{Endpoint, Method, Request, Response, Router};
/// # async fn get_user(_: Request) -> Response { Response::text("") }
/// # async fn create_user(_: Request) -> Response { Response::text("") }
/// # async fn active_users(_: Request) -> Response { Response::text("") }
/// let dispatcher = Router::new()
///     .on(Method::GET,  "/users/{id}",   get_user)
///     .on(Method::GET,  "/users/active", active_users)
///     .route(Endpoint::new("/users", create_user).method(Method::POST))
///     .build()
///     .expect("route table");
/// ```
///
/// Path parameters use `{name}` syntax, a trailing `{*name}` matches the
/// rest of the path; `req.param("name")` retrieves either.
#[derive(Debug, Default)]
pub struct Router {
    endpoints: Vec<Endpoint>,
}

impl Router {
    pub fn new() -> Self {
        Self { endpoints: Vec::new() }
    }

    /// Registers an endpoint.
    pub fn route(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Registers `handler` for one method on `path`.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.route(Endpoint::new(path, handler).method(method))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Orders the endpoints and freezes them into a dispatcher.
    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        self.build_with(Vec::new())
    }

    /// Like [`build`](Self::build), but appends `fallbacks` after the ordered
    /// endpoints, in the order given. Fallback paths count towards the
    /// duplicate check.
    pub(crate) fn build_with(self, fallbacks: Vec<Endpoint>) -> Result<Dispatcher, ConfigError> {
        let mut endpoints = order(self.endpoints)?;
        endpoints.extend(fallbacks);

        let mut seen = HashSet::new();
        for endpoint in &endpoints {
            if !seen.insert(endpoint.path()) {
                return Err(ConfigError::DuplicateRoute { path: endpoint.path().to_owned() });
            }
        }

        let routes = endpoints
            .into_iter()
            .map(CompiledRoute::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Dispatcher { routes })
    }
}

struct CompiledRoute {
    path: String,
    methods: Vec<Method>,
    matcher: Matcher<()>,
    service: BoxedService,
}

impl CompiledRoute {
    fn compile(endpoint: Endpoint) -> Result<Self, ConfigError> {
        let (path, methods, service) = endpoint.into_parts();

        let mut matcher = Matcher::new();
        if let Err(source) = matcher.insert(path.as_str(), ()) {
            return Err(ConfigError::InvalidRoute { path, source });
        }

        Ok(Self { path, methods, matcher, service })
    }

    fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }
}

/// The frozen, ordered route table.
///
/// Tries each route in precedence order and calls the first whose pattern
/// matches the path and whose methods include the request method.
///
/// - no pattern matches → `404`, `404 page not found`
/// - a pattern matches, but only for other methods → `405`, `method not allowed`
pub struct Dispatcher {
    routes: Vec<CompiledRoute>,
}

impl Dispatcher {
    /// Route patterns in the order they are tried.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.path.as_str())
    }
}

impl Service for Dispatcher {
    fn call<'a>(&'a self, mut req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        let mut wrong_method = false;

        for route in &self.routes {
            let params: HashMap<String, String> = match route.matcher.at(req.path()) {
                Ok(matched) => matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect(),
                Err(_) => continue,
            };

            if !route.allows(req.method()) {
                wrong_method = true;
                continue;
            }

            req.set_params(params);
            return route.service.call(req, res);
        }

        if wrong_method {
            debug!(method = %req.method(), path = req.path(), "no route for method");
            write_string(res, StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
        } else {
            debug!(path = req.path(), "no route");
            write_string(res, StatusCode::NOT_FOUND, "404 page not found");
        }

        Box::pin(async {})
    }
}
