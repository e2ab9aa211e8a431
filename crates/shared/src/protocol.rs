use serde::{Deserialize, Serialize};

/// Port the mail relay listens on unless configured otherwise.
pub const DEFAULT_RELAY_PORT: u16 = 3001;

pub fn send_charts_route() -> &'static str {
    "/api/send-charts"
}

pub fn health_route() -> &'static str {
    "/health"
}

/// Body of `POST /api/send-charts`. Chart fields carry `data:<mime>;base64,<payload>` URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChartsRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub monthly_chart: Option<String>,
    #[serde(default)]
    pub totals_pie_chart: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendChartsResponse {
    pub ok: bool,
    pub message_id: String,
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
}
