//! Body draining and restoration utilities.
//!
//! Capturing a body for logging consumes it. The helpers here read a body to completion and
//! hand back a fresh body over the same bytes so the next reader sees it unconsumed.

use axum::body::{Body, Bytes, HttpBody};
use http_body_util::BodyExt;

/// Error raised when a body selected for capture cannot be read.
///
/// Delegates opt into receiving it by implementing `From<BodyCaptureError>` for their error
/// type; `tower::BoxError` already does.
#[derive(Debug, thiserror::Error)]
pub enum BodyCaptureError {
    #[error("failed to read request body: {0}")]
    Request(#[source] axum::Error),
    #[error("failed to read response body: {0}")]
    Response(#[source] axum::Error),
}

/// A fully buffered body.
#[derive(Debug, Clone)]
pub struct CapturedBody {
    bytes: Bytes,
}

impl CapturedBody {
    /// The raw captured bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Body content as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// A new, unread body over the captured bytes.
    pub fn to_body(&self) -> Body {
        Body::from(self.bytes.clone())
    }
}

/// Whether a body is worth capturing: it is not already known to be empty.
pub fn has_content(body: &Body) -> bool {
    !body.is_end_stream()
}

/// Reads `body` to completion. The original body is dropped once drained.
///
/// # Examples
///
/// ```rust
/// use transport_logger::body_wrapper::capture_body;
/// use axum::body::Body;
///
/// # async fn example() -> Result<(), axum::Error> {
/// let captured = capture_body(Body::from("Hello, World!")).await?;
/// assert_eq!(captured.text(), "Hello, World!");
///
/// // Forward a fresh body in place of the drained one
/// let replacement = captured.to_body();
/// # Ok(())
/// # }
/// ```
pub async fn capture_body(body: Body) -> Result<CapturedBody, axum::Error> {
    let bytes = body.collect().await?.to_bytes();
    Ok(CapturedBody { bytes })
}
