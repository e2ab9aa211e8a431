use std::sync::{Arc, OnceLock};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use lettre::message::Mailbox;
use regex::Regex;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{SendChartsRequest, SendChartsResponse},
};
use thiserror::Error;
use tracing::{error, info};

use crate::mailer::{Mailer, OutgoingMail};

pub const MAIL_SUBJECT: &str = "Bucks2Bar charts";
pub const MAIL_TEXT: &str = "Attached are your requested charts.";
pub const MAIL_HTML: &str = "<p>Attached are your requested charts.</p>";
pub const MONTHLY_CHART_NAME: &str = "monthly-chart";
pub const TOTALS_PIE_CHART_NAME: &str = "totals-pie-chart";
const DEFAULT_ATTACHMENT_MIME: &str = "image/png";

#[derive(Clone)]
pub struct RelayContext {
    pub mailer: Arc<dyn Mailer>,
    pub mail_from: Mailbox,
    pub mail_to_fallback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum DataUrlError {
    #[error("not a base64 data URL")]
    Malformed,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

fn data_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^data:(.*?);base64,(.*)$").expect("data url regex"))
}

/// Decodes `data:<mime>;base64,<payload>`. An empty mime means `image/png`.
pub fn parse_data_url(data_url: &str) -> Result<DataUrl, DataUrlError> {
    let caps = data_url_regex()
        .captures(data_url)
        .ok_or(DataUrlError::Malformed)?;
    let mime = match &caps[1] {
        "" => DEFAULT_ATTACHMENT_MIME.to_string(),
        mime => mime.to_string(),
    };
    let bytes = STANDARD.decode(caps[2].trim())?;
    Ok(DataUrl { mime, bytes })
}

fn chart_attachment(data_url: Option<&str>, name: &str) -> Option<ChartAttachment> {
    let data_url = data_url?;
    match parse_data_url(data_url) {
        Ok(decoded) => Some(ChartAttachment {
            filename: format!("{name}.png"),
            content_type: decoded.mime,
            content: decoded.bytes,
        }),
        Err(err) => {
            info!(chart = name, %err, "skipping unusable chart image");
            None
        }
    }
}

/// Attachments for every chart field that holds a usable data URL.
pub fn collect_attachments(req: &SendChartsRequest) -> Vec<ChartAttachment> {
    [
        chart_attachment(req.monthly_chart.as_deref(), MONTHLY_CHART_NAME),
        chart_attachment(req.totals_pie_chart.as_deref(), TOTALS_PIE_CHART_NAME),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Trimmed request address, else the configured fallback recipient.
pub fn resolve_recipient(email: Option<&str>, fallback: Option<&str>) -> Result<Mailbox, ApiError> {
    let requested = email.map(str::trim).unwrap_or_default();
    let to = if requested.is_empty() {
        fallback.map(str::trim).unwrap_or_default()
    } else {
        requested
    };
    if to.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "Email is required"));
    }
    to.parse::<Mailbox>()
        .map_err(|_| ApiError::new(ErrorCode::Validation, "Invalid email address"))
}

pub async fn relay_charts(
    ctx: &RelayContext,
    req: SendChartsRequest,
) -> Result<SendChartsResponse, ApiError> {
    let to = resolve_recipient(req.email.as_deref(), ctx.mail_to_fallback.as_deref())?;

    let attachments = collect_attachments(&req);
    if attachments.is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "No chart images provided",
        ));
    }
    let attachment_count = attachments.len();

    let sent = ctx
        .mailer
        .send(OutgoingMail {
            from: ctx.mail_from.clone(),
            to,
            subject: MAIL_SUBJECT.to_string(),
            text: MAIL_TEXT.to_string(),
            html: MAIL_HTML.to_string(),
            attachments,
        })
        .await
        .map_err(|err| {
            error!(error = %err, "send-charts error");
            ApiError::new(ErrorCode::Transport, err.to_string())
        })?;

    info!(message_id = %sent.message_id, attachment_count, "charts relayed");
    Ok(SendChartsResponse {
        ok: true,
        message_id: sent.message_id,
        preview_url: sent.preview_url,
    })
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
