//! Request descriptor.
//!
//! A [`Request`] is a parsed, wire-free description of an inbound call: the
//! HTTP layer builds one per request and passes it to
//! [`Pipeline::run_with`](crate::Pipeline::run_with). The core never touches
//! sockets or wire bytes — rewriting pathnames and reading fields is the
//! entire job description.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Method ────────────────────────────────────────────────────────────────────

/// A known HTTP method (RFC 9110 §9).
///
/// Extension methods (WebDAV, cache purging) are the wire layer's concern;
/// by the time a request reaches a pipeline it carries one of these.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Connect,
    Delete,
    #[default]
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
        }
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "DELETE"  => Ok(Self::Delete),
            "GET"     => Ok(Self::Get),
            "HEAD"    => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH"   => Ok(Self::Patch),
            "POST"    => Ok(Self::Post),
            "PUT"     => Ok(Self::Put),
            "TRACE"   => Ok(Self::Trace),
            _         => Err(()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Request ───────────────────────────────────────────────────────────────────

/// A parsed inbound request.
///
/// `Clone` is load-bearing: a middleware that calls its continuation twice
/// forwards an independent copy each time, so rewrites made downstream of
/// one invocation can never leak into the other.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Request {
    method: Method,
    pathname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    query: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    headers: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cookies: Option<HashMap<String, String>>,
}

impl Request {
    pub fn new(method: Method, pathname: impl Into<String>) -> Self {
        Self { method, pathname: pathname.into(), ..Self::default() }
    }

    /// Shorthand for `Request::new(Method::Get, pathname)`.
    pub fn get(pathname: impl Into<String>) -> Self {
        Self::new(Method::Get, pathname)
    }

    /// Shorthand for `Request::new(Method::Post, pathname)`.
    pub fn post(pathname: impl Into<String>) -> Self {
        Self::new(Method::Post, pathname)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    pub fn query(&self) -> Option<&HashMap<String, String>> {
        self.query.as_ref()
    }

    /// A single query parameter, if the query string carried it.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.as_ref()?.get(key).map(String::as_str)
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
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

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.as_ref()?.get(name).map(String::as_str)
    }

    // ── Rewrite helpers ───────────────────────────────────────────────────────
    //
    // Rewrites build a fresh request; routing relies on the original staying
    // untouched so a re-invoked continuation starts from the same input.

    pub fn with_pathname(mut self, pathname: impl Into<String>) -> Self {
        self.pathname = pathname.into();
        self
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.get_or_insert_with(HashMap::new).insert(name.into(), value.into());
        self
    }
}
