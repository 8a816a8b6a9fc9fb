//! Append-only audit log.
//!
//! The pipeline produces one [`AuditRecord`] per call, rejected or not, and
//! hands it to an [`AuditRecorder`]. A background task owns the log file and
//! appends each record as one JSON line. Audit is best-effort: a failed
//! write is logged and never affects the response.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use axum::body::HttpBody;
use axum::http::header;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::context::RequestContext;

/// Records buffered before new ones are dropped.
const QUEUE_CAPACITY: usize = 4096;

/// One audited call.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    /// Arrival time.
    pub timestamp: DateTime<Utc>,
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Decoded query parameters.
    pub query_params: BTreeMap<String, String>,
    /// Client address.
    pub client_ip: String,
    /// `User-Agent` header.
    pub user_agent: Option<String>,
    /// Correlation id of the call.
    pub request_id: String,
    /// Response status.
    pub status_code: u16,
    /// Time spent in the gateway.
    pub duration_ms: f64,
    /// Declared request body size.
    pub request_bytes: Option<u64>,
    /// Response body size, when known up front.
    pub response_bytes: Option<u64>,
}

impl AuditRecord {
    /// Build a record from a call's context and its response.
    #[must_use]
    pub fn from_exchange(ctx: &RequestContext, response: &Response) -> Self {
        let response_bytes = response.body().size_hint().exact().or_else(|| {
            response
                .headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        });
        Self::from_outcome(ctx, response.status().as_u16(), response_bytes)
    }

    /// Build a record for a call that ended with `status_code`, whether or
    /// not a response was ever produced.
    #[must_use]
    pub fn from_outcome(
        ctx: &RequestContext,
        status_code: u16,
        response_bytes: Option<u64>,
    ) -> Self {
        let query_params = ctx
            .query
            .as_deref()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        Self {
            timestamp: ctx.received_at,
            method: ctx.method.to_string(),
            path: ctx.path.clone(),
            query_params,
            client_ip: ctx.client.clone(),
            user_agent: ctx.user_agent.clone(),
            request_id: ctx.request_id.to_string(),
            status_code,
            duration_ms: ctx.started.elapsed().as_secs_f64() * 1000.0,
            request_bytes: ctx.content_length,
            response_bytes,
        }
    }
}

/// Handle to the audit writer task.
#[derive(Debug, Clone)]
pub struct AuditRecorder {
    tx: Option<mpsc::Sender<AuditRecord>>,
}

impl AuditRecorder {
    /// Open `path` for appending and spawn the writer task.
    ///
    /// Parent directories are created as needed. Must be called from within
    /// a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or file cannot be created.
    pub async fn spawn(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(audit_worker(file, path.clone(), rx));

        tracing::info!(path = %path.display(), "audit log enabled");
        Ok(Self { tx: Some(tx) })
    }

    /// A recorder that only logs and never writes a file.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { tx: None }
    }

    /// Whether records are written to a file.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Log `record` and queue it for the file writer.
    pub fn record(&self, record: AuditRecord) {
        tracing::info!(
            method = %record.method,
            path = %record.path,
            status_code = record.status_code,
            duration_ms = record.duration_ms,
            client_ip = %record.client_ip,
            request_id = %record.request_id,
            "audit_log"
        );

        if let Some(tx) = &self.tx {
            if let Err(err) = tx.try_send(record) {
                tracing::error!(error = %err, "audit record dropped");
            }
        }
    }
}

async fn audit_worker(
    mut file: tokio::fs::File,
    path: PathBuf,
    mut rx: mpsc::Receiver<AuditRecord>,
) {
    while let Some(record) = rx.recv().await {
        let mut line = match serde_json::to_vec(&record) {
            Ok(line) => line,
            Err(err) => {
                tracing::error!(error = %err, "audit record serialization failed");
                continue;
            }
        };
        line.push(b'\n');

        let written = async {
            file.write_all(&line).await?;
            file.flush().await
        }
        .await;
        if let Err(err) = written {
            tracing::error!(
                path = %path.display(),
                error = %err,
                "audit log write failed"
            );
        }
    }
}
