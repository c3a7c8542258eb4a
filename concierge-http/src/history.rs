//! Chat history hooks
//!
//! After every relayed turn the connection hands a `ChatRecord` to the
//! configured `ResponseLogger`. Logging is fire-and-forget: failures are
//! reported through tracing and never reach the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

/// One question/answer exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub intent: String,
    pub question: String,
    pub answer: String,
    /// Diagnostic text when the turn failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatRecord {
    pub fn new(session_id: &str, user_id: &str, intent: &str, question: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            intent: intent.to_string(),
            question: question.to_string(),
            answer: String::new(),
            error: None,
            created_at: Utc::now(),
        }
    }
}

/// Observability hook invoked once per completed turn
pub trait ResponseLogger: Send + Sync {
    fn log_response(&self, record: ChatRecord);
}

/// Writes each record as a structured tracing event
#[derive(Debug, Default, Clone)]
pub struct TracingResponseLogger;

impl ResponseLogger for TracingResponseLogger {
    fn log_response(&self, record: ChatRecord) {
        info!(
            session_id = %record.session_id,
            user_id = %record.user_id,
            intent = %record.intent,
            question_len = record.question.len(),
            answer_len = record.answer.len(),
            failed = record.error.is_some(),
            "chat turn completed"
        );
    }
}

/// Appends records to daily JSON-lines files (`chats_YYYYMMDD.jsonl`)
#[derive(Clone)]
pub struct JsonlResponseLogger {
    folder: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonlResponseLogger {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn file_for(&self, at: DateTime<Utc>) -> PathBuf {
        self.folder.join(format!("chats_{}.jsonl", at.format("%Y%m%d")))
    }

    /// Append one record and wait for the write to finish
    pub async fn append(&self, record: &ChatRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.folder).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_for(record.created_at))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

impl ResponseLogger for JsonlResponseLogger {
    fn log_response(&self, record: ChatRecord) {
        TracingResponseLogger.log_response(record.clone());

        let logger = self.clone();
        tokio::spawn(async move {
            if let Err(e) = logger.append(&record).await {
                error!("[{}] Failed to persist chat record: {}", record.session_id, e);
            }
        });
    }
}
