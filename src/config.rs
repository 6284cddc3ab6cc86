//! Middleware configuration: the builder surface and provider resolution.
//!
//! Every knob is independently optional. Resolution order for anything not
//! set explicitly: the globally registered OpenTelemetry provider or
//! propagator, which itself defaults to a no-op. Misconfiguration therefore
//! cannot fail construction; an unconfigured middleware simply instruments
//! into the void.
//!
//! The tracer and meter are obtained here, once, tagged with this crate's
//! name and version. Requests never touch the provider registry.

use std::sync::Arc;

use opentelemetry::InstrumentationScope;
use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::metrics::MeterProvider;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{Tracer, TracerProvider};
use tracing::debug;

use crate::metrics::MetricsRecorder;
use crate::middleware::{Middleware, Shared};
use crate::observer::ObserverPool;
use crate::request::Request;
use crate::routes::RouteTable;

pub(crate) type Filter = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// The instrumentation scope every tracer and meter is tagged with.
fn scope() -> InstrumentationScope {
    InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .build()
}

/// Fluent configuration for [`Middleware`].
///
/// Obtain via [`Middleware::builder`]; terminate with
/// [`build`](MiddlewareBuilder::build).
///
/// ```rust
/// use otelware::{Middleware, Routes};
/// use http::Method;
///
/// let middleware = Middleware::builder("checkout")
///     .route_table(Routes::new().on(Method::GET, "/users/{id}"))
///     .filter(|req| req.path() != "/healthz")
///     .trace_header("x-trace-id")
///     .build();
/// ```
pub struct MiddlewareBuilder {
    service_name: String,
    tracer: Option<BoxedTracer>,
    meter: Option<opentelemetry::metrics::Meter>,
    propagator: Option<Box<dyn TextMapPropagator + Send + Sync>>,
    routes: Option<Arc<dyn RouteTable>>,
    filter: Option<Filter>,
    method_in_span_name: bool,
    disable_inflight: bool,
    disable_size: bool,
    trace_header: Option<String>,
}

impl MiddlewareBuilder {
    pub(crate) fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            tracer: None,
            meter: None,
            propagator: None,
            routes: None,
            filter: None,
            method_in_span_name: false,
            disable_inflight: false,
            disable_size: false,
            trace_header: None,
        }
    }

    /// Obtains the tracer from `provider` instead of the global registry.
    pub fn tracer_provider<P>(mut self, provider: &P) -> Self
    where
        P: TracerProvider,
        P::Tracer: Send + Sync + 'static,
        <P::Tracer as Tracer>::Span: Send + Sync + 'static,
    {
        self.tracer = Some(BoxedTracer::new(Box::new(provider.tracer_with_scope(scope()))));
        self
    }

    /// Obtains the meter from `provider` instead of the global registry.
    pub fn meter_provider<P: MeterProvider>(mut self, provider: &P) -> Self {
        self.meter = Some(provider.meter_with_scope(scope()));
        self
    }

    /// Extracts trace context with `propagator` instead of the globally
    /// registered one.
    pub fn propagator(mut self, propagator: impl TextMapPropagator + Send + Sync + 'static) -> Self {
        self.propagator = Some(Box::new(propagator));
        self
    }

    /// Supplies the application's route table, so route patterns (and span
    /// names) are known before dispatch instead of after.
    pub fn route_table(mut self, routes: impl RouteTable + 'static) -> Self {
        self.routes = Some(Arc::new(routes));
        self
    }

    /// Skips instrumentation entirely for requests the predicate rejects.
    /// Health checks are the usual tenant.
    pub fn filter(mut self, filter: impl Fn(&Request) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Prefixes span names with the HTTP method (`GET /users/{id}`). Some
    /// tracing vendors group spans poorly without it.
    pub fn method_in_span_name(mut self, enabled: bool) -> Self {
        self.method_in_span_name = enabled;
        self
    }

    /// Disables the in-flight request counter.
    pub fn disable_inflight_metric(mut self) -> Self {
        self.disable_inflight = true;
        self
    }

    /// Disables the response-size histogram.
    pub fn disable_size_metric(mut self) -> Self {
        self.disable_size = true;
        self
    }

    /// Writes the active trace id into this response header, for
    /// client-side correlation.
    pub fn trace_header(mut self, key: impl Into<String>) -> Self {
        self.trace_header = Some(key.into());
        self
    }

    /// Resolves the configuration and builds the middleware.
    pub fn build(self) -> Middleware {
        let tracer = self
            .tracer
            .unwrap_or_else(|| global::tracer_provider().tracer_with_scope(scope()));
        let meter = self
            .meter
            .unwrap_or_else(|| global::meter_provider().meter_with_scope(scope()));
        let recorder = MetricsRecorder::new(&meter);

        debug!(
            service = %self.service_name,
            route_table = self.routes.is_some(),
            filtered = self.filter.is_some(),
            "instrumentation middleware built"
        );

        Middleware::from_shared(Shared {
            service_name: self.service_name,
            tracer,
            recorder,
            propagator: self.propagator,
            routes: self.routes,
            filter: self.filter,
            method_in_span_name: self.method_in_span_name,
            disable_inflight: self.disable_inflight,
            disable_size: self.disable_size,
            trace_header: self.trace_header,
            pool: ObserverPool::new(),
        })
    }
}
