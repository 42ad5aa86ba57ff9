//! Response descriptor and builder.
//!
//! What a middleware chain hands back to whoever called `run`. A [`Response`]
//! is a description, not wire bytes — serialization belongs to the layer that
//! owns the socket.

use bytes::Bytes;
use serde_json::Value;

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing response descriptor.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use nagare::Response;
///
/// Response::text("hello");
/// Response::json(serde_json::json!({"id": 1}));
/// Response::status(204);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use nagare::Response;
///
/// Response::builder()
///     .status(201)
///     .header("location", "/users/42")
///     .json(serde_json::json!({"id": 42}));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Body,
}

/// Response payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Empty,
    Text(String),
    Json(Value),
    /// Binary payload. `Bytes` so re-running a downstream suffix clones a
    /// refcount, not the buffer.
    Bytes(Bytes),
}

impl Response {
    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_content_type("text/plain; charset=utf-8", Body::Text(body.into()))
    }

    /// `200 OK` — `application/json`.
    pub fn json(body: Value) -> Self {
        Self::with_content_type("application/json", Body::Json(body))
    }

    /// Response with no body.
    pub fn status(code: u16) -> Self {
        Self { status: code, headers: Vec::new(), body: Body::Empty }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: 200, headers: Vec::new() }
    }

    fn with_content_type(content_type: &str, body: Body) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".to_owned(), content_type.to_owned())],
            body,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// The body as text, if it is one.
    pub fn text_body(&self) -> Option<&str> {
        match &self.body {
            Body::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The body as a JSON value, if it is one.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Body::Json(v) => Some(v),
            _ => None,
        }
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to 200. Terminated by a typed
/// body method — you always know what you're sending.
pub struct ResponseBuilder {
    status: u16,
    headers: Vec<(String, String)>,
}

impl ResponseBuilder {
    pub fn status(mut self, code: u16) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", Body::Text(body.into()))
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Value) -> Response {
        self.finish("application/json", Body::Json(body))
    }

    /// Terminate with a typed binary body. Use this for anything the other
    /// terminators don't cover.
    pub fn bytes(self, content_type: &str, body: Bytes) -> Response {
        self.finish(content_type, Body::Bytes(body))
    }

    /// Terminate with no body (e.g. 204, 301).
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Body::Empty }
    }

    fn finish(self, content_type: &str, body: Body) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { status: self.status, headers, body }
    }
}
