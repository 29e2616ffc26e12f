#![allow(dead_code)]

use axum::body::Body;
use std::io;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use transport_logger::{ExchangeRecord, LogSink};

/// Sink that keeps every record it receives, with its level.
#[derive(Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<(Level, ExchangeRecord)>>>,
}

impl RecordingSink {
    pub fn records(&self) -> Vec<(Level, ExchangeRecord)> {
        self.records.lock().unwrap().clone()
    }

    pub fn single(&self) -> ExchangeRecord {
        let records = self.records();
        assert_eq!(records.len(), 1, "expected exactly one record");
        records.into_iter().next().unwrap().1
    }
}

impl LogSink for RecordingSink {
    fn emit(&self, level: Level, record: &ExchangeRecord) {
        self.records.lock().unwrap().push((level, record.clone()));
    }
}

/// In-memory writer for `tracing-subscriber` output.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }

    /// Number of exchange records written so far.
    pub fn record_count(&self) -> usize {
        self.contents()
            .matches(r#""message":"HTTP Request""#)
            .count()
    }

    /// Parsed JSON lines carrying an exchange record.
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.contents()
            .lines()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .filter(|line| line["fields"]["message"] == "HTTP Request")
            .collect()
    }

    /// A JSON subscriber writing into this buffer, enabled up to `level`.
    pub fn subscriber(&self, level: Level) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(level)
            .with_writer(self.clone())
            .finish()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub async fn read_body(body: Body) -> String {
    use http_body_util::BodyExt;

    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
