//! JSON and plain-text helpers for services that write to the sink directly.

use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::error;

use crate::error::BodyError;
use crate::request::Request;
use crate::response::{ContentType, serialization_fallback};
use crate::writer::ResponseWriter;

/// Serializes `value` and writes it with `status` as `application/json`.
///
/// If serialization fails the cause is logged and the caller receives a
/// `500` with a fixed body instead:
///
/// ```json
/// {"message":"Error marshaling value for writing","suggestion":"See error log for more information"}
/// ```
pub fn write_json<T: Serialize + ?Sized>(
    res: &mut dyn ResponseWriter,
    status: StatusCode,
    value: &T,
) {
    res.headers()
        .insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::Json.as_str()));

    match serde_json::to_vec(value) {
        Ok(body) => {
            res.write_status(status);
            res.write(&body);
        }
        Err(e) => {
            error!(error = %e, "error marshaling value for writing");
            res.write_status(StatusCode::INTERNAL_SERVER_ERROR);
            res.write(&serialization_fallback());
        }
    }
}

/// Writes `value` with `status` as `text/plain`.
pub fn write_string(res: &mut dyn ResponseWriter, status: StatusCode, value: &str) {
    res.headers()
        .insert(CONTENT_TYPE, HeaderValue::from_static(ContentType::Text.as_str()));
    res.write_status(status);
    res.write(value.as_bytes());
}

/// Decodes the request body as JSON.
pub fn read_json_body<T: DeserializeOwned>(req: &Request) -> Result<T, BodyError> {
    Ok(serde_json::from_slice(req.body())?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bytes::Bytes;
    use serde::Deserialize;

    use super::*;
    use crate::writer::ResponseBuffer;

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Sample {
        name: String,
        age: u32,
    }

    fn with_body(body: &'static str) -> Request {
        Request::new(http::Request::new(Bytes::from_static(body.as_bytes())))
    }

    #[test]
    fn reads_a_json_body() {
        let got: Sample = read_json_body(&with_body(r#"{"name":"Adam","age":10}"#)).unwrap();
        assert_eq!(got, Sample { name: "Adam".into(), age: 10 });
    }

    #[test]
    fn invalid_json_body_is_an_error() {
        let got = read_json_body::<Sample>(&with_body(r#"{"name":"#));
        assert!(matches!(got, Err(BodyError::Decode(_))));
    }

    #[test]
    fn writes_json_with_the_given_status() {
        let mut buf = ResponseBuffer::new();
        write_json(&mut buf, StatusCode::OK, &Sample { name: "Adam".into(), age: 10 });

        assert_eq!(buf.status(), StatusCode::OK);
        assert_eq!(buf.header("content-type"), Some("application/json"));
        assert_eq!(buf.body(), br#"{"name":"Adam","age":10}"#);
    }

    #[test]
    fn created_status_is_kept() {
        let mut buf = ResponseBuffer::new();
        write_json(&mut buf, StatusCode::CREATED, &[1, 2, 3]);
        assert_eq!(buf.status(), StatusCode::CREATED);
        assert_eq!(buf.body(), b"[1,2,3]");
    }

    #[test]
    fn unserializable_values_become_a_500() {
        let value: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
        let mut buf = ResponseBuffer::new();
        write_json(&mut buf, StatusCode::OK, &value);

        assert_eq!(buf.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(buf.header("content-type"), Some("application/json"));
        assert_eq!(
            buf.body(),
            br#"{"message":"Error marshaling value for writing","suggestion":"See error log for more information"}"#
        );
    }

    #[test]
    fn writes_plain_text() {
        let mut buf = ResponseBuffer::new();
        write_string(&mut buf, StatusCode::BAD_REQUEST, "this is a test");

        assert_eq!(buf.status(), StatusCode::BAD_REQUEST);
        assert_eq!(buf.header("content-type"), Some("text/plain"));
        assert_eq!(buf.body(), b"this is a test");
    }
}
