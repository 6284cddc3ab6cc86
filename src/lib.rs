//! # otelware
//!
//! OpenTelemetry tracing and metrics middleware for handler-based HTTP
//! services. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! Your handlers stay oblivious. Wrap them once and every accepted request
//! gets a server span (parented from an incoming `traceparent` when one
//! arrives), a duration histogram sample, a response-size sample, and an
//! in-flight count that is correct even while handlers are panicking.
//! otelware never changes what your handler sends, never swallows its
//! panics, and never fails construction over missing configuration: an
//! unset provider resolves to the globally registered one, which itself
//! defaults to a no-op.
//!
//! What the backends already own, otelware intentionally ignores:
//!
//! - **Sampling** — your tracer provider's sampler decides
//! - **Export transport** — the exporter pipeline's job
//! - **Route matching** — your router matched the request already; otelware
//!   only asks what pattern it matched
//!
//! What's left is the part that changes between applications: which routes
//! exist ([`Routes`]), which requests to skip ([`filter`]), and how spans
//! should be named.
//!
//! [`filter`]: MiddlewareBuilder::filter
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::Method;
//! use otelware::{BoxFuture, Middleware, Request, ResponseBuffer, ResponseWriter, Routes};
//!
//! fn get_user(_req: Request, res: &mut dyn ResponseWriter) -> BoxFuture<'_> {
//!     Box::pin(async move {
//!         let _ = res.write_body(br#"{"id":"42","name":"alice"}"#);
//!     })
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     use otelware::Handler;
//!
//!     let middleware = Middleware::builder("user-service")
//!         .route_table(Routes::new().on(Method::GET, "/users/{id}"))
//!         .filter(|req| req.path() != "/healthz")
//!         .trace_header("x-trace-id")
//!         .build();
//!
//!     let app = middleware.wrap(get_user);
//!
//!     // The host calls the wrapped handler exactly as it would the original:
//!     let mut res = ResponseBuffer::new();
//!     app.serve(Request::new(Method::GET, "/users/42"), &mut res).await;
//! }
//! ```
//!
//! ## Route patterns, not paths
//!
//! Metrics labels and span names use the *pattern* a request matched
//! (`/users/{id}`), never the literal path (`/users/42`): patterns are a
//! bounded set, paths are not. When no route table is supplied the matched
//! pattern is read back from the per-request [`RouteContext`] after
//! dispatch, because some routers only know it once the handler chain has
//! run; until then metrics fall back to the literal path.

mod config;
mod handler;
mod metrics;
mod middleware;
mod observer;
mod request;
mod response;
mod routes;
mod semconv;

pub use config::MiddlewareBuilder;
pub use handler::{BoxFuture, BoxedHandler, Handler};
pub use http::Method;
pub use middleware::{Instrumented, Middleware};
pub use request::{Request, RouteContext};
pub use response::{ResponseBuffer, ResponseWriter};
pub use routes::{RouteTable, Routes};
