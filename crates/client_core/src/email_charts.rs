use reqwest::Client;
use serde_json::Value;
use shared::protocol::{send_charts_route, SendChartsRequest, SendChartsResponse, DEFAULT_RELAY_PORT};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{chart::ChartImages, username::FeedbackTone};

const FALLBACK_SEND_ERROR: &str = "Failed to send email";

#[derive(Debug, Error)]
pub enum MailClientError {
    #[error("Charts are not ready to export")]
    ChartsNotReady,
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Base URL of the mail relay for a page served from `page_url`: the page's
/// own origin when it is already served by the relay, otherwise the same host
/// on the relay port.
pub fn relay_base_for_page(page_url: &Url) -> String {
    if page_url.port() == Some(DEFAULT_RELAY_PORT) {
        return page_url.origin().ascii_serialization();
    }
    let host = page_url.host_str().unwrap_or("localhost");
    format!("{}://{host}:{DEFAULT_RELAY_PORT}", page_url.scheme())
}

/// Browser-style `type=email` check: one `@`, non-empty local part and
/// domain, no whitespace, domain labels non-empty.
pub fn is_plausible_email(address: &str) -> bool {
    let address = address.trim();
    if address.is_empty() || address.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

pub struct ChartMailClient {
    http: Client,
    api_base: String,
}

impl ChartMailClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn for_page(page_url: &Url) -> Self {
        Self::new(relay_base_for_page(page_url))
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub async fn send_charts(
        &self,
        email: &str,
        charts: &ChartImages,
    ) -> Result<SendChartsResponse, MailClientError> {
        let request = SendChartsRequest {
            email: Some(email.trim().to_string()),
            monthly_chart: Some(charts.monthly_chart.clone()),
            totals_pie_chart: Some(charts.totals_pie_chart.clone()),
        };
        let res = self
            .http
            .post(format!("{}{}", self.api_base, send_charts_route()))
            .json(&request)
            .send()
            .await?;
        let status = res.status();
        let body: Value = res.json().await.unwrap_or(Value::Null);

        let ok = body.get("ok").and_then(Value::as_bool).unwrap_or(false);
        if !status.is_success() || !ok {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .filter(|e| !e.is_empty())
                .unwrap_or(FALLBACK_SEND_ERROR);
            return Err(MailClientError::Rejected(message.to_string()));
        }

        Ok(SendChartsResponse {
            ok,
            message_id: body
                .get("messageId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            preview_url: body
                .get("previewUrl")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailStatus {
    pub text: String,
    pub tone: Option<FeedbackTone>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailSubmitOutcome {
    InvalidAddress,
    Sent(SendChartsResponse),
    Failed(String),
}

pub struct EmailChartsForm {
    client: ChartMailClient,
    status: EmailStatus,
    input_invalid: bool,
}

impl EmailChartsForm {
    pub fn new(client: ChartMailClient) -> Self {
        Self {
            client,
            status: EmailStatus::default(),
            input_invalid: false,
        }
    }

    pub fn status(&self) -> &EmailStatus {
        &self.status
    }

    pub fn input_invalid(&self) -> bool {
        self.input_invalid
    }

    /// Clears the status line and updates the invalid marker. Returns
    /// whether the submission may go ahead.
    pub fn check_address(&mut self, email: &str) -> bool {
        self.status = EmailStatus::default();
        self.input_invalid = !is_plausible_email(email);
        !self.input_invalid
    }

    /// `charts` is the capture taken right before the call; `None` means the
    /// charts could not be exported.
    pub async fn submit(&mut self, email: &str, charts: Option<ChartImages>) -> EmailSubmitOutcome {
        if !self.check_address(email) {
            return EmailSubmitOutcome::InvalidAddress;
        }
        self.deliver(email, charts).await
    }

    async fn deliver(&mut self, email: &str, charts: Option<ChartImages>) -> EmailSubmitOutcome {
        let result = match charts {
            Some(charts) => self.client.send_charts(email, &charts).await,
            None => Err(MailClientError::ChartsNotReady),
        };

        match result {
            Ok(response) => {
                info!(message_id = %response.message_id, "charts emailed");
                self.status = EmailStatus {
                    text: match &response.preview_url {
                        Some(url) => format!("Email sent (preview: {url})"),
                        None => "Email sent successfully.".to_string(),
                    },
                    tone: Some(FeedbackTone::Success),
                };
                EmailSubmitOutcome::Sent(response)
            }
            Err(error) => {
                warn!(%error, "emailing charts failed");
                let message = error.to_string();
                self.status = EmailStatus {
                    text: format!("Error: {message}"),
                    tone: Some(FeedbackTone::Error),
                };
                EmailSubmitOutcome::Failed(message)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/email_charts_tests.rs"]
mod tests;
