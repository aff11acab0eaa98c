//! Error types.
//!
//! Application-level failures (404, 405, a bad bearer token) are expressed as
//! HTTP responses written to the sink, not as `Error`s. The types here cover
//! what is left: a broken route table at startup, a listener that cannot
//! bind, and the few per-request failures a handler may want to inspect.

use thiserror::Error;

/// The error type returned by trellis' fallible top-level operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A startup configuration mistake. Serving never begins when one occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("two endpoints share the path `{path}`")]
    DuplicateRoute { path: String },

    #[error("invalid route `{path}`: {source}")]
    InvalidRoute {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("invalid value for header `{name}`: {value:?}")]
    InvalidHeaderValue { name: &'static str, value: String },
}

/// Why an `Authorization` header was rejected.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    Missing,

    #[error("invalid authorization header, expected 'Bearer <token>'")]
    Malformed,

    #[error("unsupported authorization scheme `{0}`")]
    UnsupportedScheme(String),
}

/// A request body that could not be decoded.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("error unmarshaling body to destination: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Returned by [`validate_method`](crate::validate_method) after it has
/// written a 405 response.
#[derive(Debug, Error)]
#[error("method `{method}` not allowed, expected `{expected}`")]
pub struct MethodNotAllowed {
    pub method: http::Method,
    pub expected: http::Method,
}
