//! Append-only audit trail
//!
//! Every inbound webhook and every downstream CRM outcome gets one
//! newline-delimited JSON record. Writes are best-effort: a full queue or a
//! failing sink is reported through `tracing` and never propagates back into
//! the request pipeline.

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

/// Which stage of the pipeline produced the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditCategory {
    /// Inbound delivery handling (verification, parsing, receipt)
    Webhook,
    /// Downstream CRM synchronization outcome
    Crm,
}

/// Outcome recorded for the stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Error,
}

/// One audit trail entry. Append-only, never mutated after `record`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub category: AuditCategory,
    pub status: AuditStatus,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<String>,
}

impl AuditRecord {
    pub fn new(
        category: AuditCategory,
        status: AuditStatus,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            category,
            status,
            details: details.into(),
            topic: None,
            shop: None,
            order_id: None,
            webhook_id: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_shop(mut self, shop: impl Into<String>) -> Self {
        self.shop = Some(shop.into());
        self
    }

    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_webhook_id(mut self, webhook_id: impl Into<String>) -> Self {
        self.webhook_id = Some(webhook_id.into());
        self
    }
}

/// In-memory sink used by tests to assert on the recorded trail
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemorySink {
    /// Snapshot of everything recorded so far, in append order
    pub fn entries(&self) -> Vec<AuditRecord> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn push(&self, record: AuditRecord) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(record);
        }
    }
}

enum Sink {
    File(File),
    Memory(MemorySink),
}

enum Message {
    Record(Box<AuditRecord>),
    Flush(oneshot::Sender<()>),
}

/// Handle to the audit writer task. Cheap to clone; all clones feed the same
/// bounded queue, so records from one task land in enqueue order.
#[derive(Clone)]
pub struct AuditLog {
    tx: mpsc::Sender<Message>,
}

/// Bounded so a stalled sink exerts backpressure by dropping (and reporting)
/// rather than growing without limit.
const QUEUE_CAPACITY: usize = 1024;

impl AuditLog {
    /// Open (or create) an NDJSON log file in append mode and start the
    /// writer task.
    pub async fn to_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self::spawn(Sink::File(file)))
    }

    /// Writer backed by an in-memory vector, for tests
    pub fn in_memory() -> (Self, MemorySink) {
        let sink = MemorySink::default();
        (Self::spawn(Sink::Memory(sink.clone())), sink)
    }

    fn spawn(sink: Sink) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(run_writer(rx, sink));
        Self { tx }
    }

    /// Enqueue one record. Non-blocking; a full or closed queue drops the
    /// record and reports it on the diagnostic channel instead of failing
    /// the caller.
    pub fn record(&self, record: AuditRecord) {
        if let Err(e) = self.tx.try_send(Message::Record(Box::new(record))) {
            tracing::error!(error = %e, "audit record dropped (queue unavailable)");
        }
    }

    /// Wait until everything enqueued before this call has reached the sink
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Message::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run_writer(mut rx: mpsc::Receiver<Message>, mut sink: Sink) {
    while let Some(msg) = rx.recv().await {
        match msg {
            Message::Record(record) => append(&mut sink, &record).await,
            Message::Flush(done) => {
                if let Sink::File(file) = &mut sink {
                    if let Err(e) = file.flush().await {
                        tracing::error!(error = %e, "audit log flush failed");
                    }
                }
                let _ = done.send(());
            }
        }
    }
}

/// One complete line per record; a single `write_all` keeps concurrent
/// producers from interleaving inside an entry.
async fn append(sink: &mut Sink, record: &AuditRecord) {
    match sink {
        Sink::File(file) => {
            let mut line = match serde_json::to_string(record) {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(error = %e, "audit record serialization failed");
                    return;
                }
            };
            line.push('\n');
            if let Err(e) = file.write_all(line.as_bytes()).await {
                tracing::error!(error = %e, "audit log append failed");
            }
        }
        Sink::Memory(mem) => mem.push(record.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_preserve_enqueue_order() {
        let (log, sink) = AuditLog::in_memory();
        for i in 0..10 {
            log.record(AuditRecord::new(
                AuditCategory::Webhook,
                AuditStatus::Success,
                format!("entry {i}"),
            ));
        }
        log.flush().await;

        let details: Vec<String> =
            sink.entries().into_iter().map(|r| r.details).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("entry {i}")).collect();
        assert_eq!(details, expected);
    }

    #[tokio::test]
    async fn file_sink_appends_one_json_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("webhook.log");

        let log = AuditLog::to_file(&path).await.unwrap();
        log.record(
            AuditRecord::new(AuditCategory::Webhook, AuditStatus::Success, "received")
                .with_webhook_id("wh-1")
                .with_topic("orders/create"),
        );
        log.record(
            AuditRecord::new(AuditCategory::Crm, AuditStatus::Error, "login failed")
                .with_order_id("42"),
        );
        log.flush().await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.category, AuditCategory::Webhook);
        assert_eq!(first.webhook_id.as_deref(), Some("wh-1"));

        let second: AuditRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.category, AuditCategory::Crm);
        assert_eq!(second.status, AuditStatus::Error);
        assert_eq!(second.order_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn optional_fields_are_omitted_from_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");

        let log = AuditLog::to_file(&path).await.unwrap();
        log.record(AuditRecord::new(
            AuditCategory::Webhook,
            AuditStatus::Error,
            "bad signature",
        ));
        log.flush().await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(!contents.contains("order_id"));
        assert!(!contents.contains("webhook_id"));
    }
}
