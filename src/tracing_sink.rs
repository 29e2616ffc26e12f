//! `tracing` implementation of [`LogSink`].
//!
//! Records are emitted as a single `tracing` event with the message [`RECORD_MESSAGE`] and
//! grouped field names:
//!
//! | field                                   | value                                    |
//! |-----------------------------------------|------------------------------------------|
//! | `request.started_at`                    | RFC 3339 timestamp                       |
//! | `request.method`, `request.url`         | display form                             |
//! | `request.content_length`                | integer, omitted when unknown            |
//! | `request.proto`                         | e.g. `HTTP/1.1`                          |
//! | `request.headers`, `response.headers`   | JSON text, omitted unless captured       |
//! | `request.body_content`, `response.body_content` | text, omitted unless captured    |
//! | `response.error`                        | delegate error, omitted on success       |
//! | `response.status`, `response.status_code` | reason phrase and numeric code         |
//! | `response.content_length`               | integer, omitted when unknown            |
//! | `response.time_taken`                   | duration until the delegate answered     |
//! | `response.content_type`                 | `Content-Type` value or empty            |
//!
//! `tracing` field values are scalars, so a header group reaches the subscriber as one string
//! holding a JSON object, e.g. `{"accept":"application/json"}`. A JSON formatter writes it as an
//! escaped string rather than a nested object; consumers that want the map decode that field
//! again, or read [`HeaderFields`](crate::HeaderFields) from a custom [`LogSink`].

use tracing::{field, Dispatch, Level};

use crate::{ExchangeRecord, LogSink, RECORD_MESSAGE};

macro_rules! exchange_event {
    ($level:expr, $record:expr) => {{
        let request = &$record.request;
        let response = &$record.response;
        tracing::event!(
            $level,
            request.started_at = %request.started_at_rfc3339(),
            request.method = %request.method,
            request.content_length = request.content_length,
            request.proto = ?request.version,
            request.url = %request.url,
            request.headers = request.headers.as_ref().map(field::display),
            request.body_content = request.body_content.as_deref(),
            response.error = response.error.as_deref(),
            response.status = response.status_text(),
            response.status_code = response.status.map(|status| status.as_u16()),
            response.content_length = response.content_length,
            response.time_taken = response.time_taken.map(field::debug),
            response.content_type = response.content_type.as_deref(),
            response.headers = response.headers.as_ref().map(field::display),
            response.body_content = response.body_content.as_deref(),
            "{}",
            RECORD_MESSAGE
        )
    }};
}

/// Sink that emits records as `tracing` events.
///
/// [`TracingSink::current`] resolves the dispatcher at every emit, so replacing the global or
/// thread-local subscriber after the decorator was built takes effect on its next record.
/// [`TracingSink::new`] pins a specific dispatcher instead.
///
/// # Examples
///
/// ```rust
/// use transport_logger::{TracingSink, TransportLoggerConfig, TransportLoggerLayer};
/// use std::sync::Arc;
///
/// let dispatch = tracing::Dispatch::new(tracing_subscriber::fmt().json().finish());
/// let layer = TransportLoggerLayer::new(TransportLoggerConfig::default())
///     .with_sink(Some(Arc::new(TracingSink::new(dispatch))));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    dispatch: Option<Dispatch>,
}

impl TracingSink {
    /// Emit through whichever dispatcher is current when a record is emitted.
    pub fn current() -> Self {
        Self { dispatch: None }
    }

    /// Emit through `dispatch` regardless of the current default.
    pub fn new(dispatch: Dispatch) -> Self {
        Self {
            dispatch: Some(dispatch),
        }
    }
}

impl LogSink for TracingSink {
    fn emit(&self, level: Level, record: &ExchangeRecord) {
        match &self.dispatch {
            Some(dispatch) => {
                tracing::dispatcher::with_default(dispatch, || emit_event(level, record))
            }
            None => emit_event(level, record),
        }
    }
}

// Callsite levels must be constants, hence one event per level.
fn emit_event(level: Level, record: &ExchangeRecord) {
    if level == Level::ERROR {
        exchange_event!(Level::ERROR, record);
    } else if level == Level::WARN {
        exchange_event!(Level::WARN, record);
    } else if level == Level::INFO {
        exchange_event!(Level::INFO, record);
    } else if level == Level::DEBUG {
        exchange_event!(Level::DEBUG, record);
    } else {
        exchange_event!(Level::TRACE, record);
    }
}
