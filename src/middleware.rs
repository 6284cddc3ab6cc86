//! The middleware facade and the per-request instrumentation flow.
//!
//! [`Middleware`] is built once from a resolved configuration and wraps any
//! number of handlers; each wrap shares the same tracer, instruments and
//! observer pool. The wrapped handler runs the full pipeline per request:
//! filter check, context extraction, route pre-resolution, in-flight
//! increment, span start, response observation, dispatch, finalization.
//!
//! Cleanup is guard-based. The in-flight decrement, the observer release
//! and the span's end all ride destructors registered before the downstream
//! call, so a handler that panics unwinds past them without leaking a span
//! or a counter increment, and without this layer swallowing the panic.

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue, global};

use crate::config::{Filter, MiddlewareBuilder};
use crate::handler::{BoxFuture, Handler};
use crate::metrics::{InflightGuard, MetricsRecorder, RequestProperties};
use crate::observer::ObserverPool;
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::routes::RouteTable;
use crate::semconv;

/// Request instrumentation middleware.
///
/// ```rust
/// use http::Method;
/// use otelware::{BoxFuture, Middleware, Request, ResponseWriter, Routes};
///
/// fn get_user(_req: Request, res: &mut dyn ResponseWriter) -> BoxFuture<'_> {
///     Box::pin(async move {
///         let _ = res.write_body(br#"{"id":"42"}"#);
///     })
/// }
///
/// let middleware = Middleware::builder("user-service")
///     .route_table(Routes::new().on(Method::GET, "/users/{id}"))
///     .build();
///
/// let app = middleware.wrap(get_user);
/// // hand `app` to the host in place of `get_user`
/// ```
pub struct Middleware {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    pub(crate) service_name: String,
    pub(crate) tracer: global::BoxedTracer,
    pub(crate) recorder: MetricsRecorder,
    pub(crate) propagator: Option<Box<dyn TextMapPropagator + Send + Sync>>,
    pub(crate) routes: Option<Arc<dyn RouteTable>>,
    pub(crate) filter: Option<Filter>,
    pub(crate) method_in_span_name: bool,
    pub(crate) disable_inflight: bool,
    pub(crate) disable_size: bool,
    pub(crate) trace_header: Option<String>,
    pub(crate) pool: ObserverPool,
}

impl Middleware {
    /// Starts configuring middleware for the named (virtual) server.
    pub fn builder(service_name: impl Into<String>) -> MiddlewareBuilder {
        MiddlewareBuilder::new(service_name)
    }

    pub(crate) fn from_shared(shared: Shared) -> Self {
        Self { shared: Arc::new(shared) }
    }

    /// Wraps a handler. The returned handler implements the full
    /// instrumentation contract and is itself a [`Handler`], so wraps
    /// compose.
    pub fn wrap(&self, next: impl Handler) -> Instrumented {
        Instrumented {
            shared: Arc::clone(&self.shared),
            next: Arc::new(next),
        }
    }
}

// ── Instrumented ──────────────────────────────────────────────────────────────

/// A handler wrapped with instrumentation. Built by [`Middleware::wrap`].
pub struct Instrumented {
    shared: Arc<Shared>,
    next: Arc<dyn Handler>,
}

impl Handler for Instrumented {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        Box::pin(self.instrument(req, res))
    }
}

impl Instrumented {
    async fn instrument(&self, mut req: Request, res: &mut dyn ResponseWriter) {
        let m = &*self.shared;

        // Filtered-out requests bypass instrumentation entirely.
        if let Some(filter) = &m.filter {
            if !filter(&req) {
                return self.next.serve(req, res).await;
            }
        }

        let parent_cx = m.extract(&req);

        // With a route table the pattern is known up front and doubles as
        // the span name. Without one, metrics fall back to the literal path
        // and the pattern is re-read from the routing context after
        // dispatch, once the router has recorded it.
        let pre_resolved = m
            .routes
            .as_ref()
            .and_then(|table| table.match_route(req.method(), req.path()));

        let mut props = RequestProperties {
            service: m.service_name.clone(),
            id: pre_resolved.clone().unwrap_or_else(|| req.path().to_owned()),
            method: req.method().clone(),
            status: 0,
        };

        // Counted in before dispatch, out on drop: the decrement must run
        // on every exit path, so it lives in the guard's destructor.
        let _inflight = (!m.disable_inflight)
            .then(|| InflightGuard::count(&m.recorder, props.clone()));

        let span_name = match &pre_resolved {
            Some(pattern) => semconv::span_name(m.method_in_span_name, req.method(), pattern),
            None => String::new(),
        };
        let span = m
            .tracer
            .span_builder(span_name)
            .with_kind(SpanKind::Server)
            .with_attributes(m.request_attributes(&req, pre_resolved.as_deref()))
            .start_with_context(&m.tracer, &parent_cx);
        let cx = parent_cx.with_span(span);

        if let Some(key) = &m.trace_header {
            let span = cx.span();
            let span_context = span.span_context();
            if span_context.is_valid() {
                res.insert_header(key, &span_context.trace_id().to_string());
            }
        }

        let route_ctx = Arc::clone(req.route_context());
        let method = req.method().clone();
        req.set_trace_context(cx.clone());

        let started = Instant::now();
        let mut observed = m.pool.acquire(res);
        self.next.serve(req, &mut observed).await;
        let elapsed = started.elapsed();

        props.status = observed.status();
        let bytes_written = observed.bytes_written();

        m.recorder.record_duration(&props, elapsed);
        if !m.disable_size {
            m.recorder.record_size(&props, bytes_written);
        }

        let span = cx.span();
        if pre_resolved.is_none() {
            let pattern = route_ctx.pattern().unwrap_or_default();
            span.set_attribute(KeyValue::new(semconv::HTTP_ROUTE, pattern.clone()));
            span.update_name(semconv::span_name(m.method_in_span_name, &method, &pattern));
        }
        if props.status > 0 {
            span.set_attribute(KeyValue::new(
                semconv::HTTP_RESPONSE_STATUS_CODE,
                i64::from(props.status),
            ));
        }
        span.set_status(semconv::span_status(props.status));

        // Release order: observer back to the pool, span ended, then the
        // in-flight guard drops at end of scope.
        drop(observed);
        span.end();
    }
}

impl Shared {
    fn extract(&self, req: &Request) -> Context {
        let extractor = HeaderExtractor(req.headers());
        match &self.propagator {
            Some(propagator) => propagator.extract(&extractor),
            None => global::get_text_map_propagator(|propagator| propagator.extract(&extractor)),
        }
    }

    fn request_attributes(&self, req: &Request, route: Option<&str>) -> Vec<KeyValue> {
        let mut attrs = vec![
            KeyValue::new(semconv::HTTP_REQUEST_METHOD, req.method().as_str().to_owned()),
            KeyValue::new(semconv::URL_PATH, req.path().to_owned()),
            KeyValue::new(semconv::NETWORK_PROTOCOL_NAME, "http"),
        ];
        if let Some(host) = req.header("host") {
            attrs.push(KeyValue::new(semconv::SERVER_ADDRESS, host.to_owned()));
        }
        if let Some(user_agent) = req.header("user-agent") {
            attrs.push(KeyValue::new(semconv::USER_AGENT_ORIGINAL, user_agent.to_owned()));
        }
        if let Some(route) = route {
            attrs.push(KeyValue::new(semconv::HTTP_ROUTE, route.to_owned()));
        }
        attrs
    }
}

// ── Header carrier ────────────────────────────────────────────────────────────

/// Propagation carrier over the request's header list.
struct HeaderExtractor<'a>(&'a [(String, String)]);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.iter().map(|(k, _)| k.as_str()).collect()
    }
}
