use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{health_route, send_charts_route, HealthResponse, SendChartsRequest, SendChartsResponse},
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod mailer;

use api::{relay_charts, RelayContext};
use config::load_settings;
use mailer::{mailer_from_settings, resolve_sender};

#[derive(Clone)]
struct AppState {
    relay: RelayContext,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let relay = RelayContext {
        mailer: mailer_from_settings(&settings.mail)?,
        mail_from: resolve_sender(&settings.mail)?,
        mail_to_fallback: settings.mail.to_fallback.clone(),
    };
    let state = Arc::new(AppState { relay });

    let app = build_router(state, settings.max_json_bytes);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, max_json_bytes = settings.max_json_bytes, "mail relay listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_json_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(health_route(), get(health))
        .route(send_charts_route(), post(send_charts))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_json_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn status_for(code: Option<&ErrorCode>) -> StatusCode {
    match code {
        Some(ErrorCode::Validation) => StatusCode::BAD_REQUEST,
        Some(ErrorCode::PayloadTooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
        Some(ErrorCode::Transport) | Some(ErrorCode::Internal) | None => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn map_api_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    (status_for(err.code.as_ref()), Json(err))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        ts: chrono::Utc::now().timestamp_millis(),
    })
}

fn is_form_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
}

fn parse_form_body(body: &[u8]) -> SendChartsRequest {
    let mut req = SendChartsRequest::default();
    for (key, value) in url::form_urlencoded::parse(body) {
        let value = Some(value.into_owned());
        match key.as_ref() {
            "email" => req.email = value,
            "monthlyChart" => req.monthly_chart = value,
            "totalsPieChart" => req.totals_pie_chart = value,
            _ => {}
        }
    }
    req
}

/// An empty body reads as `{}`. Form-encoded bodies are accepted next to JSON.
fn parse_send_charts(headers: &HeaderMap, body: &[u8]) -> Result<SendChartsRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SendChartsRequest::default());
    }
    if is_form_encoded(headers) {
        return Ok(parse_form_body(body));
    }
    serde_json::from_slice(body)
        .map_err(|err| ApiError::new(ErrorCode::Validation, format!("Invalid JSON body: {err}")))
}

async fn send_charts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<SendChartsResponse> {
    let req = parse_send_charts(&headers, &body).map_err(map_api_error)?;
    relay_charts(&state.relay, req)
        .await
        .map(Json)
        .map_err(map_api_error)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
