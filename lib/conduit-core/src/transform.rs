//! Payload transforms.
//!
//! A [`Transform`] maps a payload to a new payload and may edit the headers it
//! travels with. [`apply`] folds a list of them left to right.

use std::sync::Arc;

use crate::headers::CONTENT_TYPE;
use crate::{Body, ContentType, Headers, Result};

/// A payload transform.
pub type Transform = Arc<dyn Fn(Option<Body>, &mut Headers) -> Result<Option<Body>> + Send + Sync>;

/// Wrap a closure as a [`Transform`].
///
/// ```
/// use conduit_core::{Body, Headers, transform};
///
/// let shout = transform::transform_fn(|data, _headers| {
///     Ok(data.map(|body| match body {
///         Body::Text(text) => Body::Text(text.to_uppercase()),
///         other => other,
///     }))
/// });
///
/// let out = transform::apply(Some(Body::from("hi")), &mut Headers::new(), &[shout])
///     .expect("transform");
/// assert_eq!(out, Some(Body::from("HI")));
/// ```
pub fn transform_fn<F>(f: F) -> Transform
where
    F: Fn(Option<Body>, &mut Headers) -> Result<Option<Body>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Fold `transforms` over `data`, sharing `headers` between steps.
///
/// # Errors
///
/// Returns the first error raised by a step; later steps do not run.
pub fn apply(data: Option<Body>, headers: &mut Headers, transforms: &[Transform]) -> Result<Option<Body>> {
    transforms
        .iter()
        .try_fold(data, |data, transform| transform(data, &mut *headers))
}

/// The default request transform.
///
/// Structured values and query-parameter objects are serialized to text and
/// get a matching `Content-Type` unless one is already set. Buffer views are
/// unwrapped to their underlying buffer. Everything else passes unchanged.
#[must_use]
pub fn default_request_transform() -> Transform {
    transform_fn(|data, headers| {
        let Some(body) = data else {
            return Ok(None);
        };
        let body = match body {
            Body::View(view) => Body::Bytes(view.into_buffer()),
            Body::UrlEncoded(pairs) => {
                headers.set_if_unset(CONTENT_TYPE, ContentType::FormUrlEncoded.with_charset());
                Body::Text(serde_urlencoded::to_string(&pairs)?)
            }
            Body::Json(value) => {
                headers.set_if_unset(CONTENT_TYPE, ContentType::Json.with_charset());
                Body::Text(serde_json::to_string(&value)?)
            }
            other @ (Body::Bytes(_) | Body::Multipart(_) | Body::Text(_)) => other,
        };
        Ok(Some(body))
    })
}

/// The default response transform.
///
/// Text payloads that parse as JSON become [`Body::Json`]; anything else,
/// including text that fails to parse, passes unchanged.
#[must_use]
pub fn default_response_transform() -> Transform {
    transform_fn(|data, _headers| {
        Ok(data.map(|body| match body {
            Body::Text(text) => match serde_json::from_str(&text) {
                Ok(value) => Body::Json(value),
                Err(_) => Body::Text(text),
            },
            other => other,
        }))
    })
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::{BufferView, Error, Form};

    fn request(data: Body) -> (Option<Body>, Headers) {
        let mut headers = Headers::new();
        let out = apply(Some(data), &mut headers, &[default_request_transform()]).expect("transform");
        (out, headers)
    }

    #[test]
    fn json_is_serialized_with_content_type() {
        let (out, headers) = request(Body::Json(json!({"a": [1, 2]})));

        assert_eq!(out, Some(Body::from(r#"{"a":[1,2]}"#)));
        assert_eq!(headers.get("content-type"), Some("application/json;charset=utf-8"));
    }

    #[test]
    fn url_encoded_is_serialized_with_content_type() {
        let (out, headers) = request(Body::UrlEncoded(vec![
            ("q".to_string(), "a b".to_string()),
            ("n".to_string(), "1".to_string()),
        ]));

        assert_eq!(out, Some(Body::from("q=a+b&n=1")));
        assert_eq!(
            headers.get(CONTENT_TYPE),
            Some("application/x-www-form-urlencoded;charset=utf-8")
        );
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let mut headers: Headers = [("content-type", "application/vnd.api+json")].into_iter().collect();
        let out = apply(Some(Body::Json(json!(1))), &mut headers, &[default_request_transform()])
            .expect("transform");

        assert_eq!(out, Some(Body::from("1")));
        assert_eq!(headers.get(CONTENT_TYPE), Some("application/vnd.api+json"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn opaque_payloads_pass_unchanged() {
        let form = Form::with_boundary("x").text("a", "b");
        for body in [
            Body::Bytes(Bytes::from_static(b"\x00\x01")),
            Body::Multipart(form),
            Body::from("plain"),
        ] {
            let (out, headers) = request(body.clone());
            assert_eq!(out, Some(body));
            check!(headers.is_empty());
        }

        let (out, _) = request(Body::from(
            BufferView::new(Bytes::from_static(b"abcdef"), 2..4).expect("view"),
        ));
        assert_eq!(out, Some(Body::Bytes(Bytes::from_static(b"abcdef"))));
    }

    #[test]
    fn absent_payload_stays_absent() {
        let out = apply(None, &mut Headers::new(), &[default_request_transform()]).expect("transform");
        check!(out.is_none());
    }

    #[test]
    fn response_text_is_decoded_leniently() {
        let transforms = [default_response_transform()];
        let mut headers = Headers::new();

        let out = apply(Some(Body::from(r#"{"ok":true}"#)), &mut headers, &transforms).expect("json");
        assert_eq!(out, Some(Body::Json(json!({"ok": true}))));

        let out = apply(Some(Body::from("not json")), &mut headers, &transforms).expect("text");
        assert_eq!(out, Some(Body::from("not json")));
    }

    #[test]
    fn fold_order_and_short_circuit() {
        let append = |suffix: &'static str| {
            transform_fn(move |data, _| {
                Ok(data.map(|body| match body {
                    Body::Text(text) => Body::Text(text + suffix),
                    other => other,
                }))
            })
        };
        let fail = transform_fn(|_, _| Err(Error::adapter("transform failed")));

        let out = apply(Some(Body::from("x")), &mut Headers::new(), &[append("1"), append("2")])
            .expect("fold");
        assert_eq!(out, Some(Body::from("x12")));

        let result = apply(
            Some(Body::from("x")),
            &mut Headers::new(),
            &[append("1"), fail, append("2")],
        );
        let_assert!(Err(Error::Adapter(message)) = result);
        assert_eq!(message, "transform failed");
    }
}
