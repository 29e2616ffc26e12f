//! Process default transport and one-time global installation.
//!
//! The process default transport is what [`TransportLoggerService::new`] wraps when no explicit
//! transport is given. Until replaced with [`set_default_transport`] it is a plain-HTTP hyper
//! client; callers that need TLS or custom pooling install their own.

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::sync::{Arc, Once, OnceLock};
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Service, ServiceExt};
use tracing::debug;

use crate::{TransportLoggerConfig, TransportLoggerService};

/// Type-erased client transport: `Request<Body>` in, `Response<Body>` or [`BoxError`] out.
pub type HttpTransport = BoxCloneSyncService<Request<Body>, Response<Body>, BoxError>;

static DEFAULT_TRANSPORT: OnceLock<ArcSwap<HttpTransport>> = OnceLock::new();
static INSTALL: Once = Once::new();

fn slot() -> &'static ArcSwap<HttpTransport> {
    DEFAULT_TRANSPORT.get_or_init(|| ArcSwap::from_pointee(hyper_transport()))
}

fn hyper_transport() -> HttpTransport {
    let client = Client::builder(TokioExecutor::new()).build_http::<Body>();
    into_http_transport(client.map_response(|response: Response<Incoming>| response.map(Body::new)))
}

/// Box any compatible client service into an [`HttpTransport`].
pub fn into_http_transport<T>(transport: T) -> HttpTransport
where
    T: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    T::Future: Send + 'static,
    T::Error: Into<BoxError>,
{
    BoxCloneSyncService::new(transport.map_err(|e: T::Error| -> BoxError { e.into() }))
}

/// The transport currently installed as the process default.
pub fn default_transport() -> HttpTransport {
    HttpTransport::clone(&slot().load_full())
}

/// Replace the process default transport.
///
/// Decorators built earlier keep the transport they resolved at construction.
pub fn set_default_transport<T>(transport: T)
where
    T: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    T::Future: Send + 'static,
    T::Error: Into<BoxError>,
{
    slot().store(Arc::new(into_http_transport(transport)));
}

/// Wrap the process default transport in a [`TransportLoggerService`] with the default
/// configuration.
///
/// Only the first call in a process installs anything; concurrent first calls all observe that
/// single installation.
pub fn install() {
    INSTALL.call_once(|| {
        let logged = TransportLoggerService::with_transport(
            TransportLoggerConfig::default(),
            Some(default_transport()),
        );
        set_default_transport(logged);
        debug!("Installed transport logger as the process default transport");
    });
}

/// Whether [`install`] has run in this process.
pub fn is_installed() -> bool {
    INSTALL.is_completed()
}
