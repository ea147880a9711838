// src/services/email.rs

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone)]
pub struct SentEmailInfo {
  pub to: String,
  pub from: String,
  pub subject: String,
  pub body_preview: String, // First N chars of body
  pub message_id: String,
}

/// Narrow interface over email delivery. The engine only ever needs
/// "send this template to this recipient"; delivery internals live elsewhere.
#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, to: &str, from: &str, subject: &str, html_body: &str) -> Result<SentEmailInfo>;
}

/// Mailer that logs sends and records them for inspection. A subject or
/// recipient containing `fail_test` simulates a delivery failure, which is
/// how the tests exercise the best-effort notification boundaries.
#[derive(Default)]
pub struct RecordingMailer {
  sent: Mutex<Vec<SentEmailInfo>>,
}

impl RecordingMailer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn sent(&self) -> Vec<SentEmailInfo> {
    self.sent.lock().clone()
  }

  pub fn sent_count(&self) -> usize {
    self.sent.lock().len()
  }
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, to: &str, from: &str, subject: &str, html_body: &str) -> Result<SentEmailInfo> {
    info!("Sending email: To='{}', From='{}', Subject='{}'", to, from, subject);

    if subject.to_lowercase().contains("fail_test") || to.to_lowercase().contains("fail_test") {
      tracing::warn!("Simulated email failure for subject: {}", subject);
      return Err(AppError::Email("Simulated email send failure".to_string()));
    }

    let body_preview = html_body.chars().take(50).collect::<String>() + "...";
    let message_id = format!("email_{}", Uuid::new_v4());
    let sent = SentEmailInfo {
      to: to.to_string(),
      from: from.to_string(),
      subject: subject.to_string(),
      body_preview,
      message_id,
    };
    self.sent.lock().push(sent.clone());
    Ok(sent)
  }
}
