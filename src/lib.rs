//! # Transport Logger
//!
//! A tower transport decorator that wraps an HTTP client service and emits one structured log
//! record for every outbound request/response pair, without changing what callers observe.
//!
//! ## Features
//!
//! - **Transparent**: responses and errors from the wrapped transport are returned verbatim
//! - **Configurable capture**: request/response bodies and headers are each opt-in
//! - **Content-preserving**: captured bodies are replaced with identical, unread bodies
//! - **Pluggable sinks**: records go to `tracing` by default, or to any [`LogSink`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::body::Body;
//! use axum::http::Request;
//! use tower::ServiceExt;
//! use tracing::Level;
//! use transport_logger::{TransportLoggerConfig, TransportLoggerService};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), tower::BoxError> {
//! let config = TransportLoggerConfig {
//!     level: Level::DEBUG,
//!     capture_response_body: true,
//!     capture_response_headers: true,
//!     ..TransportLoggerConfig::default()
//! };
//!
//! // Wraps the process default transport
//! let client = TransportLoggerService::new(config);
//!
//! let request = Request::get("http://localhost:3000/hello").body(Body::empty())?;
//! let response = client.oneshot(request).await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```
//!
//! ## As a layer
//!
//! ```rust
//! use axum::body::Body;
//! use axum::http::{Request, Response};
//! use tower::{BoxError, Layer, service_fn};
//! use transport_logger::{TransportLoggerConfig, TransportLoggerLayer};
//!
//! let transport = service_fn(|_req: Request<Body>| async {
//!     Ok::<_, BoxError>(Response::new(Body::from("pong")))
//! });
//!
//! let client = TransportLoggerLayer::new(TransportLoggerConfig::default()).layer(transport);
//! ```

use axum::body::Body;
use axum::http::{Request, Response};
use futures::future::BoxFuture;
use std::{
    fmt,
    sync::Arc,
    task::{Context, Poll},
    time::{Instant, SystemTime},
};
use tower::{BoxError, Layer, Service};
use tracing::{debug, Level};

pub mod types;
pub use types::{ExchangeRecord, HeaderFields, RequestSnapshot, ResponseSnapshot};

pub mod body_wrapper;
pub use body_wrapper::BodyCaptureError;
use body_wrapper::{capture_body, has_content};

pub mod tracing_sink;
pub use tracing_sink::TracingSink;

pub mod transport;
pub use transport::{
    default_transport, install, into_http_transport, is_installed, set_default_transport,
    HttpTransport,
};

/// Message every exchange record is emitted with.
pub const RECORD_MESSAGE: &str = "HTTP Request";

/// Configuration for the transport decorator.
///
/// Controls the severity records are emitted at and which parts of the exchange are captured.
///
/// # Examples
///
/// ```rust
/// use transport_logger::TransportLoggerConfig;
/// use tracing::Level;
///
/// // INFO level, nothing captured beyond metadata
/// let config = TransportLoggerConfig::default();
///
/// // Everything, at DEBUG
/// let config = TransportLoggerConfig {
///     level: Level::DEBUG,
///     capture_request_body: true,
///     capture_response_body: true,
///     capture_request_headers: true,
///     capture_response_headers: true,
/// };
/// ```
#[derive(Clone, Debug)]
pub struct TransportLoggerConfig {
    /// Severity of emitted records
    pub level: Level,
    /// Whether to capture request bodies
    pub capture_request_body: bool,
    /// Whether to capture response bodies
    pub capture_response_body: bool,
    /// Whether to capture request headers
    pub capture_request_headers: bool,
    /// Whether to capture response headers
    pub capture_response_headers: bool,
}

impl Default for TransportLoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            capture_request_body: false,
            capture_response_body: false,
            capture_request_headers: false,
            capture_response_headers: false,
        }
    }
}

/// Destination for exchange records.
///
/// The sink applies its own level filtering; the decorator hands it every record together with
/// the configured severity and performs no pre-check of its own.
///
/// # Examples
///
/// ```rust
/// use transport_logger::{ExchangeRecord, LogSink};
/// use tracing::Level;
///
/// struct StdoutSink;
///
/// impl LogSink for StdoutSink {
///     fn emit(&self, level: Level, record: &ExchangeRecord) {
///         println!("{level} {} {} -> {:?}",
///                  record.request.method, record.request.url, record.response.status);
///     }
/// }
/// ```
pub trait LogSink: Send + Sync + 'static {
    /// Emit one record at `level`.
    fn emit(&self, level: Level, record: &ExchangeRecord);
}

fn sink_or_default(sink: Option<Arc<dyn LogSink>>) -> Arc<dyn LogSink> {
    sink.unwrap_or_else(|| Arc::new(TracingSink::current()))
}

/// Tower layer for the transport decorator.
///
/// Wraps any client service accepting `Request<Body>` and returning `Response<Body>` in a
/// [`TransportLoggerService`].
#[derive(Clone)]
pub struct TransportLoggerLayer {
    config: TransportLoggerConfig,
    sink: Arc<dyn LogSink>,
}

impl TransportLoggerLayer {
    /// Create a layer that logs through the current `tracing` dispatcher.
    pub fn new(config: TransportLoggerConfig) -> Self {
        Self {
            config,
            sink: sink_or_default(None),
        }
    }

    /// Replace the sink. `None` keeps the default `tracing` sink.
    pub fn with_sink(mut self, sink: Option<Arc<dyn LogSink>>) -> Self {
        self.sink = sink_or_default(sink);
        self
    }
}

impl<S> Layer<S> for TransportLoggerLayer
where
    S: Service<Request<Body>>,
    S::Error: From<BodyCaptureError>,
{
    type Service = TransportLoggerService<S, S::Error>;

    fn layer(&self, inner: S) -> Self::Service {
        TransportLoggerService {
            inner,
            config: self.config.clone(),
            sink: self.sink.clone(),
            capture_error: <S::Error as From<BodyCaptureError>>::from,
        }
    }
}

/// Tower service implementation of the transport decorator.
///
/// Each call records request metadata, optionally drains and restores the request body,
/// forwards to the wrapped transport, optionally drains and restores the response body and then
/// emits a single [`ExchangeRecord`]. The wrapped transport's result is returned unchanged.
///
/// Body capture buffers the whole body in memory. A body that fails to read aborts the call
/// with a [`BodyCaptureError`], converted into the wrapped transport's error type `E`, and no
/// record is emitted.
pub struct TransportLoggerService<S, E = BoxError> {
    inner: S,
    config: TransportLoggerConfig,
    sink: Arc<dyn LogSink>,
    // Resolved at construction; the `Service` impl carries no conversion bound.
    capture_error: fn(BodyCaptureError) -> E,
}

impl<S: Clone, E> Clone for TransportLoggerService<S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: self.config.clone(),
            sink: self.sink.clone(),
            capture_error: self.capture_error,
        }
    }
}

fn box_capture_error(err: BodyCaptureError) -> BoxError {
    Box::new(err)
}

impl TransportLoggerService<HttpTransport> {
    /// Wrap the process default transport, as it is at the time of the call.
    pub fn new(config: TransportLoggerConfig) -> Self {
        Self::with_transport(config, None::<HttpTransport>)
    }

    /// Wrap `transport`, or the process default transport when `None`.
    pub fn with_transport<T>(config: TransportLoggerConfig, transport: Option<T>) -> Self
    where
        T: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
        T::Future: Send + 'static,
        T::Error: Into<BoxError>,
    {
        let inner = transport
            .map(into_http_transport)
            .unwrap_or_else(default_transport);

        Self {
            inner,
            config,
            sink: sink_or_default(None),
            capture_error: box_capture_error,
        }
    }
}

impl<S, E> TransportLoggerService<S, E> {
    /// Replace the sink. `None` keeps the default `tracing` sink.
    pub fn with_sink(mut self, sink: Option<Arc<dyn LogSink>>) -> Self {
        self.sink = sink_or_default(sink);
        self
    }

    /// The configuration this decorator was built with.
    pub fn config(&self) -> &TransportLoggerConfig {
        &self.config
    }

    /// Gets a reference to the wrapped transport.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consumes the decorator, returning the wrapped transport.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, E> Service<Request<Body>> for TransportLoggerService<S, E>
where
    S: Service<Request<Body>, Response = Response<Body>, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    type Response = Response<Body>;
    type Error = E;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // Take the instance that was poll_ready'd and leave a fresh clone behind.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(round_trip(
            inner,
            self.config.clone(),
            self.sink.clone(),
            self.capture_error,
            request,
        ))
    }
}

async fn round_trip<S, E>(
    mut inner: S,
    config: TransportLoggerConfig,
    sink: Arc<dyn LogSink>,
    capture_error: fn(BodyCaptureError) -> E,
    mut request: Request<Body>,
) -> Result<Response<Body>, E>
where
    S: Service<Request<Body>, Response = Response<Body>, Error = E>,
    E: fmt::Display,
{
    let start = Instant::now();
    let mut request_data = RequestSnapshot::from_request(SystemTime::now(), &request);

    if config.capture_request_body && has_content(request.body()) {
        debug!(method = %request_data.method, url = %request_data.url, "Capturing request body");
        let body = std::mem::take(request.body_mut());
        let captured = match capture_body(body).await {
            Ok(captured) => captured,
            Err(e) => {
                debug!(error = %e, "Request body capture failed");
                return Err(capture_error(BodyCaptureError::Request(e)));
            }
        };
        request_data.body_content = Some(captured.text());
        *request.body_mut() = captured.to_body();
    }

    if config.capture_request_headers {
        request_data.headers = HeaderFields::capture(request.headers());
    }

    let result = inner.call(request).await;

    let (result, response_data) = match result {
        Ok(mut response) => {
            let mut response_data = ResponseSnapshot::from_response(&response, start.elapsed());

            if config.capture_response_body && has_content(response.body()) {
                debug!(status = %response.status(), "Capturing response body");
                let body = std::mem::take(response.body_mut());
                let captured = match capture_body(body).await {
                    Ok(captured) => captured,
                    Err(e) => {
                        debug!(error = %e, "Response body capture failed");
                        return Err(capture_error(BodyCaptureError::Response(e)));
                    }
                };
                response_data.body_content = Some(captured.text());
                *response.body_mut() = captured.to_body();
            }

            if config.capture_response_headers {
                response_data.headers = HeaderFields::capture(response.headers());
            }

            (Ok(response), response_data)
        }
        Err(e) => {
            let response_data = ResponseSnapshot::failed(&e);
            (Err(e), response_data)
        }
    };

    sink.emit(
        config.level,
        &ExchangeRecord {
            request: request_data,
            response: response_data,
        },
    );

    result
}
