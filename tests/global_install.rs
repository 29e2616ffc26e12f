//! Process-wide installation. Kept in its own test binary so the global default transport is
//! not shared with other tests.

mod common;

use axum::body::Body;
use axum::http::{Request, Response};
use common::CapturedLogs;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tower::{service_fn, BoxError, ServiceExt};
use tracing::Level;
use transport_logger::{
    default_transport, install, is_installed, set_default_transport, HttpTransport,
    TransportLoggerConfig, TransportLoggerService,
};

#[tokio::test]
async fn test_install_wraps_default_transport_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counting = {
        let calls = calls.clone();
        service_fn(move |_req: Request<Body>| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, BoxError>(Response::new(Body::from("pong"))) }
        })
    };
    set_default_transport(counting);

    // Built before installation: both keep the unwrapped transport they resolved
    let early = TransportLoggerService::new(TransportLoggerConfig::default());
    let fallback = TransportLoggerService::with_transport(
        TransportLoggerConfig::default(),
        None::<HttpTransport>,
    )
    .with_sink(None);

    assert!(!is_installed());
    let installers: Vec<_> = (0..8).map(|_| std::thread::spawn(install)).collect();
    for installer in installers {
        installer.join().unwrap();
    }
    install();
    assert!(is_installed());

    let logs = CapturedLogs::default();
    let _guard = tracing::subscriber::set_default(logs.subscriber(Level::INFO));

    let request = Request::get("http://localhost/").body(Body::empty()).unwrap();
    let response = default_transport().oneshot(request).await.unwrap();
    assert_eq!(common::read_body(response.into_body()).await, "pong");

    // One layer of wrapping despite repeated installs
    assert_eq!(logs.record_count(), 1, "{}", logs.contents());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let spawned = tokio::spawn(async move {
        let request = Request::get("http://localhost/").body(Body::empty()).unwrap();
        early.oneshot(request).await
    });
    spawned.await.unwrap().unwrap();

    // The early decorator logs once itself and is not double-wrapped
    assert_eq!(logs.record_count(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // No transport and no sink: the process default transport, logged through tracing
    let request = Request::get("http://localhost/fallback").body(Body::empty()).unwrap();
    let response = fallback.oneshot(request).await.unwrap();
    assert_eq!(common::read_body(response.into_body()).await, "pong");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let records = logs.records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2]["fields"]["request.url"], "http://localhost/fallback");
}
