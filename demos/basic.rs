//! Minimal otelware example: a few instrumented requests, end to end.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! A real host would hand the wrapped handler its live connections; here a
//! handful of requests are served in-process and the spans the middleware
//! produced are dumped at the end, so you can see exactly what a collector
//! would receive.

use std::sync::Arc;

use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};

use otelware::{
    BoxFuture, Handler, Method, Middleware, Request, ResponseBuffer, ResponseWriter, Routes,
};

fn get_user(req: Request, res: &mut dyn ResponseWriter) -> BoxFuture<'_> {
    Box::pin(async move {
        // Handlers can parent their own spans from the middleware's context:
        let _cx = req.trace_context();
        res.insert_header("content-type", "application/json");
        let _ = res.write_body(br#"{"id":"42","name":"alice"}"#);
    })
}

fn create_user(req: Request, res: &mut dyn ResponseWriter) -> BoxFuture<'_> {
    Box::pin(async move {
        if req.body().is_empty() {
            res.write_status(400);
            return;
        }
        res.write_status(201);
        res.insert_header("location", "/users/99");
        let _ = res.write_body(br#"{"id":"99"}"#);
    })
}

fn healthz(_req: Request, res: &mut dyn ResponseWriter) -> BoxFuture<'_> {
    Box::pin(async move {
        let _ = res.write_body(b"ok");
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let exporter = InMemorySpanExporter::default();
    let tracer_provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();

    let middleware = Middleware::builder("user-service")
        .tracer_provider(&tracer_provider)
        .route_table(
            Routes::new()
                .on(Method::GET, "/users/{id}")
                .on(Method::POST, "/users")
                .on(Method::GET, "/healthz"),
        )
        .filter(|req| req.path() != "/healthz")
        .method_in_span_name(true)
        .trace_header("x-trace-id")
        .build();

    // One wrap per route handler; they all share the same instruments.
    let routes: Vec<(Method, &str, Arc<dyn Handler>)> = vec![
        (Method::GET, "/users/42", Arc::new(middleware.wrap(get_user))),
        (Method::POST, "/users", Arc::new(middleware.wrap(create_user))),
        (Method::GET, "/healthz", Arc::new(middleware.wrap(healthz))),
    ];

    for (method, path, handler) in &routes {
        let req = Request::new(method.clone(), *path)
            .with_header("host", "localhost:3000")
            .with_header("user-agent", "basic-demo/0.1")
            .with_body(if *method == Method::POST { &b"{\"name\":\"bob\"}"[..] } else { &b""[..] });

        let mut res = ResponseBuffer::new();
        handler.serve(req, &mut res).await;

        let mut wire = Vec::new();
        res.write_to(&mut wire).await.expect("in-memory write");
        println!("── {method} {path}");
        println!("{}", String::from_utf8_lossy(&wire).trim_end());
        println!();
    }

    for span in exporter.get_finished_spans().expect("in-memory exporter") {
        println!(
            "span {:?} status={:?} attrs={}",
            span.name,
            span.status,
            span.attributes.len(),
        );
    }
}
