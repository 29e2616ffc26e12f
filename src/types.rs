//! Data types for captured HTTP exchange information.
//!
//! This module contains the per-call snapshots the decorator builds while a request travels
//! through it. Snapshots live only for the duration of one call: they are handed to the
//! [`LogSink`](crate::LogSink) and dropped.

use axum::body::HttpBody;
use axum::http::{header, HeaderMap, Method, Request, Response, StatusCode, Version};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime};

/// Captured header values, one per header name.
///
/// Only the first value of a multi-valued header is kept, the same value
/// [`HeaderMap::get`] returns. Values that are not valid UTF-8 are converted lossily.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields(BTreeMap<String, String>);

impl HeaderFields {
    /// Capture the representative value of every header name in `headers`.
    ///
    /// Returns `None` when the map is empty so that no empty group is logged.
    pub fn capture(headers: &HeaderMap) -> Option<Self> {
        let fields: BTreeMap<String, String> = headers
            .keys()
            .filter_map(|name| {
                headers.get(name).map(|value| {
                    (
                        name.as_str().to_owned(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
            })
            .collect();

        (!fields.is_empty()).then_some(Self(fields))
    }

    /// Value captured for `name`, if any. Names are lowercase.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Number of captured header names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no header was captured. Never true for a group produced by [`Self::capture`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Name/value pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Renders the headers as a JSON object, e.g. `{"accept":"*/*"}`.
impl fmt::Display for HeaderFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Data captured from an outbound HTTP request.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    /// When the decorator started handling the request
    pub started_at: SystemTime,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Declared `Content-Length`, else the body's exact size hint, if known
    pub content_length: Option<u64>,
    /// Protocol version the request was built with
    pub version: Version,
    /// Full request URL in string form
    pub url: String,
    /// Request headers, if header capture is enabled and any are present
    pub headers: Option<HeaderFields>,
    /// Request body text, if body capture is enabled and the body was non-empty
    pub body_content: Option<String>,
}

impl RequestSnapshot {
    pub(crate) fn from_request<B: HttpBody>(started_at: SystemTime, request: &Request<B>) -> Self {
        Self {
            started_at,
            method: request.method().clone(),
            content_length: content_length(request.headers(), request.body()),
            version: request.version(),
            url: request.uri().to_string(),
            headers: None,
            body_content: None,
        }
    }

    /// `started_at` as an RFC 3339 UTC timestamp with microsecond precision.
    pub fn started_at_rfc3339(&self) -> String {
        DateTime::<Utc>::from(self.started_at).to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

/// Data captured from the delegate's answer.
///
/// `error` is set when the delegate failed; every other field is only set when it
/// returned a response.
#[derive(Debug, Clone, Default)]
pub struct ResponseSnapshot {
    /// Display form of the delegate's error
    pub error: Option<String>,
    /// HTTP status code (200, 404, 500, etc.)
    pub status: Option<StatusCode>,
    /// Declared `Content-Length`, else the body's exact size hint, if known
    pub content_length: Option<u64>,
    /// Time from the start of the call until the delegate answered
    pub time_taken: Option<Duration>,
    /// `Content-Type` header value; empty when the response has none
    pub content_type: Option<String>,
    /// Response headers, if header capture is enabled and any are present
    pub headers: Option<HeaderFields>,
    /// Response body text, if body capture is enabled and the body was non-empty
    pub body_content: Option<String>,
}

impl ResponseSnapshot {
    pub(crate) fn failed(error: &impl fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn from_response<B: HttpBody>(response: &Response<B>, time_taken: Duration) -> Self {
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_default();

        Self {
            error: None,
            status: Some(response.status()),
            content_length: content_length(response.headers(), response.body()),
            time_taken: Some(time_taken),
            content_type: Some(content_type),
            headers: None,
            body_content: None,
        }
    }

    /// Canonical reason phrase for the status, empty for unregistered codes.
    pub fn status_text(&self) -> Option<&'static str> {
        self.status
            .map(|status| status.canonical_reason().unwrap_or_default())
    }
}

/// One request/response pair, as handed to a [`LogSink`](crate::LogSink).
#[derive(Debug, Clone)]
pub struct ExchangeRecord {
    /// What was sent
    pub request: RequestSnapshot,
    /// What came back, or the delegate's error
    pub response: ResponseSnapshot,
}

fn content_length<B: HttpBody>(headers: &HeaderMap, body: &B) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .or_else(|| body.size_hint().exact())
}
