//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

use crate::context::RequestContext;

/// An incoming HTTP request with its body fully read.
///
/// Owned by exactly one in-flight call chain. Middleware that derives values
/// from the request attaches them through [`Request::with_context`] before
/// handing the request inward.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    params: HashMap<String, String>,
    context: RequestContext,
}

impl Request {
    /// Wraps an `http::Request` whose body has already been collected.
    pub fn new(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            remote_addr: None,
            params: HashMap::new(),
            context: RequestContext::default(),
        }
    }

    /// Records the peer address of the connection the request arrived on.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Replaces the request context with an extended snapshot.
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }
    pub fn context(&self) -> &RequestContext { &self.context }

    /// Raw query string without the leading `?`, empty when absent.
    pub fn query(&self) -> &str {
        self.uri.query().unwrap_or("")
    }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Best guess at the caller's IP address.
    ///
    /// Requests that come through a proxy carry the client in
    /// `X-Forwarded-For`; the first entry of that list wins. Otherwise the
    /// peer address of the connection is used, without its port.
    pub fn real_ip(&self) -> Option<String> {
        let forwarded = self
            .header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match forwarded {
            Some(ip) => Some(ip.to_owned()),
            None => self.remote_addr.map(|addr| addr.ip().to_string()),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request {
    let mut builder = http::Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    Request::new(builder.body(Bytes::new()).unwrap())
        .with_remote_addr("127.0.0.1:54321".parse().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_ip_falls_back_to_the_peer_address() {
        let req = test_request("GET", "/", &[]);
        assert_eq!(req.real_ip().as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn real_ip_prefers_forwarded_for() {
        let req = test_request("GET", "/", &[("X-Forwarded-For", "127.0.0.2")]);
        assert_eq!(req.real_ip().as_deref(), Some("127.0.0.2"));
    }

    #[test]
    fn real_ip_takes_the_client_entry_of_a_proxy_chain() {
        let req = test_request("GET", "/", &[("X-Forwarded-For", "203.0.113.7, 10.0.0.1")]);
        assert_eq!(req.real_ip().as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn real_ip_is_none_without_any_source() {
        let req = Request::new(http::Request::new(Bytes::new()));
        assert_eq!(req.real_ip(), None);
    }

    #[test]
    fn query_is_empty_when_absent() {
        assert_eq!(test_request("GET", "/a?b=1&c=2", &[]).query(), "b=1&c=2");
        assert_eq!(test_request("GET", "/a", &[]).query(), "");
    }
}
