//! Deferred access logging.
//!
//! The request path queues one entry per request on an unbounded channel
//! and moves on; a background task drains the channel and writes through
//! `tracing`. A full or closed channel is swallowed, never surfaced to
//! the client.

use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct RequestLog {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub client_ip: String,
    pub latency_ms: u64,
}

#[derive(Clone)]
pub struct RequestLogger {
    tx: mpsc::UnboundedSender<RequestLog>,
}

impl RequestLogger {
    /// Spawn the background writer. Must be called inside a tokio runtime.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<RequestLog>();

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if entry.status >= 500 {
                    tracing::warn!(
                        target: "gateway::access",
                        request_id = %entry.request_id,
                        method = %entry.method,
                        path = %entry.path,
                        status = entry.status,
                        client_ip = %entry.client_ip,
                        latency_ms = entry.latency_ms,
                        "Request failed"
                    );
                } else {
                    tracing::info!(
                        target: "gateway::access",
                        request_id = %entry.request_id,
                        method = %entry.method,
                        path = %entry.path,
                        status = entry.status,
                        client_ip = %entry.client_ip,
                        latency_ms = entry.latency_ms,
                        "Request completed"
                    );
                }
            }
        });

        Self { tx }
    }

    /// Queue an entry without waiting on the writer.
    pub fn record(&self, entry: RequestLog) {
        // A closed channel only means the worker is gone; drop the entry
        let _ = self.tx.send(entry);
    }
}
