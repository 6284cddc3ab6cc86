//! Request metrics: the label set, the three instruments, and recording.
//!
//! Instrument names and units follow the OpenTelemetry HTTP server
//! conventions. All three are created once per middleware construction and
//! shared by every in-flight request; the SDK synchronizes recording
//! internally, so this layer holds no locks. Recording is infallible by
//! contract: whatever the exporter pipeline does with a measurement is not
//! this layer's concern.

use std::time::Duration;

use http::Method;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Histogram, Meter, UpDownCounter};

use crate::semconv;

// ── RequestProperties ─────────────────────────────────────────────────────────

/// The label set every measurement is recorded against.
///
/// `id` is the matched route pattern when one is known, else the literal
/// request path. `status` stays `0` until the response is observed and is
/// omitted from the attributes while zero, so pre-dispatch and post-dispatch
/// recordings against the same request agree on their series.
#[derive(Clone, Debug)]
pub(crate) struct RequestProperties {
    pub(crate) service: String,
    pub(crate) id: String,
    pub(crate) method: Method,
    pub(crate) status: u16,
}

impl RequestProperties {
    fn attributes(&self) -> Vec<KeyValue> {
        let mut attrs = vec![
            KeyValue::new(semconv::SERVICE_NAME, self.service.clone()),
            KeyValue::new(semconv::HTTP_ROUTE, self.id.clone()),
            KeyValue::new(semconv::HTTP_REQUEST_METHOD, self.method.as_str().to_owned()),
        ];
        if self.status > 0 {
            attrs.push(KeyValue::new(
                semconv::HTTP_RESPONSE_STATUS_CODE,
                i64::from(self.status),
            ));
        }
        attrs
    }
}

// ── MetricsRecorder ───────────────────────────────────────────────────────────

pub(crate) struct MetricsRecorder {
    inflight: UpDownCounter<i64>,
    duration: Histogram<f64>,
    size: Histogram<u64>,
}

impl MetricsRecorder {
    pub(crate) fn new(meter: &Meter) -> Self {
        Self {
            inflight: meter
                .i64_up_down_counter("http.server.active_requests")
                .with_description("Number of HTTP requests currently being handled.")
                .with_unit("{request}")
                .build(),
            duration: meter
                .f64_histogram("http.server.request.duration")
                .with_description("Duration of HTTP server requests.")
                .with_unit("s")
                .build(),
            size: meter
                .u64_histogram("http.server.response.body.size")
                .with_description("Size of HTTP server response bodies.")
                .with_unit("By")
                .build(),
        }
    }

    pub(crate) fn record_inflight(&self, props: &RequestProperties, delta: i64) {
        self.inflight.add(delta, &props.attributes());
    }

    pub(crate) fn record_duration(&self, props: &RequestProperties, elapsed: Duration) {
        self.duration.record(elapsed.as_secs_f64(), &props.attributes());
    }

    pub(crate) fn record_size(&self, props: &RequestProperties, bytes: u64) {
        self.size.record(bytes, &props.attributes());
    }
}

// ── InflightGuard ─────────────────────────────────────────────────────────────

/// Counts a request in on construction and out on drop.
///
/// The decrement rides `Drop` so it runs on every exit path, a panicking
/// handler included. Both edges record against the label set captured at
/// construction, which keeps every series netting to zero.
pub(crate) struct InflightGuard<'a> {
    recorder: &'a MetricsRecorder,
    props: RequestProperties,
}

impl<'a> InflightGuard<'a> {
    pub(crate) fn count(recorder: &'a MetricsRecorder, props: RequestProperties) -> Self {
        recorder.record_inflight(&props, 1);
        Self { recorder, props }
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.recorder.record_inflight(&self.props, -1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(status: u16) -> RequestProperties {
        RequestProperties {
            service: "checkout".to_owned(),
            id: "/users/{id}".to_owned(),
            method: Method::GET,
            status,
        }
    }

    #[test]
    fn status_attribute_is_omitted_while_zero() {
        let has_status = |props: &RequestProperties| {
            props
                .attributes()
                .iter()
                .any(|kv| kv.key.as_str() == semconv::HTTP_RESPONSE_STATUS_CODE)
        };

        assert!(!has_status(&props(0)));
        assert!(has_status(&props(200)));
    }
}
