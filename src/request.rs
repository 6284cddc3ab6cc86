//! Incoming HTTP request type and the per-request routing context.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{Extensions, Method};
use opentelemetry::Context;

/// An incoming HTTP request at the middleware boundary.
///
/// Hosts build one per request and hand it to the handler chain. Header
/// lookup is case-insensitive; path parameters, bodies and anything else the
/// host wants to attach ride in [`extensions`](Request::extensions).
pub struct Request {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Bytes,
    route: Arc<RouteContext>,
    extensions: Extensions,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: Bytes::new(),
            route: Arc::new(RouteContext::default()),
            extensions: Extensions::new(),
        }
    }

    /// Adds a header. Returns `self` so construction chains naturally.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
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

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The routing context shared between the host router and middleware.
    pub fn route_context(&self) -> &Arc<RouteContext> {
        &self.route
    }

    /// The trace context established for this request.
    ///
    /// Instrumentation stores the context carrying the active server span
    /// here before dispatch; handlers use it to parent their own spans. An
    /// untraced request yields an empty context.
    pub fn trace_context(&self) -> Context {
        self.extensions
            .get::<Context>()
            .cloned()
            .unwrap_or_else(Context::new)
    }

    pub(crate) fn set_trace_context(&mut self, cx: Context) {
        self.extensions.insert(cx);
    }

    /// Host extension data attached to this request.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

// ── RouteContext ──────────────────────────────────────────────────────────────

/// Per-request routing state.
///
/// Some routers only know which pattern a request matched while they are
/// dispatching it. The host router records the pattern here as it resolves;
/// middleware keeps a clone of the `Arc` and re-reads the pattern after the
/// handler returns.
#[derive(Debug, Default)]
pub struct RouteContext {
    pattern: Mutex<Option<String>>,
}

impl RouteContext {
    /// Records the matched route pattern. A later match (e.g. a nested
    /// router) replaces an earlier one.
    pub fn set_pattern(&self, pattern: impl Into<String>) {
        let mut slot = self.pattern.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(pattern.into());
    }

    /// The matched pattern, if the router recorded one.
    pub fn pattern(&self) -> Option<String> {
        self.pattern.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
