use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    api::RelayContext,
    mailer::{Mailer, OutgoingMail, SentMail},
};

/// 1x1 transparent PNG.
pub const TINY_PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR4nGMAAQAABQABDQottAAAAABJRU5ErkJggg==";

pub fn tiny_png_data_url() -> String {
    format!("data:image/png;base64,{TINY_PNG_B64}")
}

#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<OutgoingMail>>>,
    pub fail_with: Option<String>,
}

impl RecordingMailer {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().expect("sent lock").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<SentMail> {
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{message}");
        }
        let count = {
            let mut sent = self.sent.lock().expect("sent lock");
            sent.push(mail);
            sent.len()
        };
        Ok(SentMail {
            message_id: format!("<test-{count}@localhost>"),
            preview_url: None,
        })
    }
}

pub fn relay_context(mailer: &RecordingMailer, fallback: Option<&str>) -> RelayContext {
    RelayContext {
        mailer: Arc::new(mailer.clone()),
        mail_from: "Bucks2Bar <no-reply@localhost>".parse().expect("from"),
        mail_to_fallback: fallback.map(str::to_string),
    }
}
