//! Outgoing mail: message building plus SMTP and file-outbox transports.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;
use uuid::Uuid;

use crate::{api::ChartAttachment, config::MailSettings};

pub const DEFAULT_FROM: &str = "Bucks2Bar <no-reply@localhost>";

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub from: Mailbox,
    pub to: Mailbox,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachments: Vec<ChartAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub message_id: String,
    pub preview_url: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<SentMail>;
}

/// `<uuid@domain>` using the sender's domain.
pub fn new_message_id(from: &Mailbox) -> String {
    format!("<{}@{}>", Uuid::new_v4(), from.email.domain())
}

pub fn build_message(mail: &OutgoingMail, message_id: &str) -> anyhow::Result<Message> {
    let mut body = MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
        mail.text.clone(),
        mail.html.clone(),
    ));
    for attachment in &mail.attachments {
        let content_type = ContentType::parse(&attachment.content_type)
            .or_else(|_| ContentType::parse("image/png"))
            .map_err(|err| anyhow!("invalid attachment content type: {err}"))?;
        body = body.singlepart(
            Attachment::new(attachment.filename.clone())
                .body(attachment.content.clone(), content_type),
        );
    }

    Message::builder()
        .from(mail.from.clone())
        .to(mail.to.clone())
        .subject(mail.subject.clone())
        .message_id(Some(message_id.to_string()))
        .multipart(body)
        .context("failed to build message")
}

/// Sender address: `MAIL_FROM`, then the SMTP user, then [`DEFAULT_FROM`].
pub fn resolve_sender(settings: &MailSettings) -> anyhow::Result<Mailbox> {
    if let Some(from) = &settings.from {
        return from
            .parse()
            .with_context(|| format!("invalid MAIL_FROM {from:?}"));
    }
    if let Some(user) = &settings.smtp_user {
        if let Ok(mailbox) = user.parse::<Mailbox>() {
            return Ok(mailbox);
        }
    }
    DEFAULT_FROM.parse().context("invalid default sender")
}

/// Login for the SMTP host when either half is configured; the missing half is empty.
pub fn smtp_login(settings: &MailSettings) -> Option<(String, String)> {
    if settings.smtp_user.is_none() && settings.smtp_pass.is_none() {
        return None;
    }
    Some((
        settings.smtp_user.clone().unwrap_or_default(),
        settings.smtp_pass.clone().unwrap_or_default(),
    ))
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn from_url(url: &str) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(url)
            .context("invalid SMTP_URL")?
            .build();
        Ok(Self { transport })
    }

    /// Implicit TLS when `secure`, otherwise STARTTLS when the server offers it.
    pub fn from_host(settings: &MailSettings, host: &str) -> anyhow::Result<Self> {
        let builder = if settings.smtp_secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .with_context(|| format!("invalid SMTP_HOST {host:?}"))?
        } else {
            let tls = TlsParameters::new(host.to_string())
                .with_context(|| format!("invalid SMTP_HOST {host:?}"))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .tls(Tls::Opportunistic(tls))
        };
        let mut builder = builder.port(settings.smtp_port);

        if let Some((user, pass)) = smtp_login(settings) {
            builder = builder.credentials(Credentials::new(user, pass));
        }
        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<SentMail> {
        let message_id = new_message_id(&mail.from);
        let message = build_message(&mail, &message_id)?;
        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;
        Ok(SentMail {
            message_id,
            preview_url: None,
        })
    }
}

/// Writes each message as `<id>.eml` into a local directory.
pub struct OutboxMailer {
    transport: AsyncFileTransport<Tokio1Executor>,
    dir: PathBuf,
}

impl OutboxMailer {
    pub fn new(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create outbox '{}'", dir.display()))?;
        let dir = dir
            .canonicalize()
            .with_context(|| format!("failed to resolve outbox '{}'", dir.display()))?;
        Ok(Self {
            transport: AsyncFileTransport::new(&dir),
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<SentMail> {
        let message_id = new_message_id(&mail.from);
        let message = build_message(&mail, &message_id)?;
        let file_id = self
            .transport
            .send(message)
            .await
            .context("failed to write outbox message")?;
        let path = self.dir.join(format!("{file_id}.eml"));
        Ok(SentMail {
            message_id,
            preview_url: Some(format!("file://{}", path.display())),
        })
    }
}

/// Picks the transport: `SMTP_URL`, then `SMTP_HOST`, then the file outbox.
pub fn mailer_from_settings(settings: &MailSettings) -> anyhow::Result<Arc<dyn Mailer>> {
    if let Some(url) = &settings.smtp_url {
        info!("using SMTP transport from SMTP_URL");
        return Ok(Arc::new(SmtpMailer::from_url(url)?));
    }
    if let Some(host) = &settings.smtp_host {
        info!(%host, port = settings.smtp_port, secure = settings.smtp_secure, "using SMTP transport");
        return Ok(Arc::new(SmtpMailer::from_host(settings, host)?));
    }
    let outbox = OutboxMailer::new(&settings.outbox_dir)?;
    info!(dir = %outbox.dir().display(), "no SMTP configured; writing mail to outbox");
    Ok(Arc::new(outbox))
}

#[cfg(test)]
#[path = "tests/mailer_tests.rs"]
mod tests;
