//! Handler contract and type erasure.
//!
//! A handler consumes the [`Request`] and writes its response into a
//! [`ResponseWriter`] it borrows for the duration of the call. The future is
//! boxed so handlers of different concrete types can share one trait object,
//! and so middleware can hold the downstream handler as `Arc<dyn Handler>`
//! without knowing its type. The per-request cost is one heap allocation for
//! the future plus one virtual call, which disappears against network I/O.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::ResponseWriter;

/// A heap-allocated, type-erased future that resolves when the handler has
/// finished writing its response.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// The downstream request handler contract.
///
/// Implement it directly on your handler type:
///
/// ```rust
/// use otelware::{BoxFuture, Handler, Request, ResponseWriter};
///
/// struct Hello;
///
/// impl Handler for Hello {
///     fn serve<'a>(&'a self, _req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
///         Box::pin(async move {
///             let _ = res.write_body(b"hello");
///         })
///     }
/// }
/// ```
///
/// Plain functions with the same shape implement it automatically:
///
/// ```rust
/// use otelware::{BoxFuture, Request, ResponseWriter};
///
/// fn hello(_req: Request, res: &mut dyn ResponseWriter) -> BoxFuture<'_> {
///     Box::pin(async move {
///         let _ = res.write_body(b"hello");
///     })
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Handles one request, writing the response into `res`.
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a>;
}

/// A shared, type-erased handler. One `Arc` clone per concurrent request.
pub type BoxedHandler = Arc<dyn Handler>;

impl<F> Handler for F
where
    F: for<'a> Fn(Request, &'a mut dyn ResponseWriter) -> BoxFuture<'a>,
    F: Send + Sync + 'static,
{
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        (self)(req, res)
    }
}

impl Handler for BoxedHandler {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a> {
        (**self).serve(req, res)
    }
}
