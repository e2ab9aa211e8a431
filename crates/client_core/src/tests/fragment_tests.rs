use super::*;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;

#[derive(Default)]
struct FakeContainer {
    path: Option<String>,
    html: String,
}

impl FakeContainer {
    fn including(path: &str) -> Self {
        Self {
            path: Some(path.to_string()),
            html: String::new(),
        }
    }
}

impl FragmentContainer for FakeContainer {
    fn include_path(&self) -> Option<String> {
        self.path.clone()
    }

    fn replace_content(&mut self, html: &str) {
        self.html = html.to_string();
    }
}

struct FakeFetcher {
    pages: HashMap<String, String>,
}

#[async_trait]
impl FragmentFetcher for FakeFetcher {
    async fn fetch(&self, path: &str) -> Result<String, FragmentError> {
        self.pages
            .get(path)
            .cloned()
            .ok_or_else(|| FragmentError::Status {
                path: path.to_string(),
                status: 404,
            })
    }
}

#[derive(Default)]
struct RecordingHost {
    events: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ScriptHost for RecordingHost {
    async fn load_external(&self, script: &Script) -> anyhow::Result<()> {
        let src = script.src().unwrap_or_default().to_string();
        self.events.lock().expect("events").push(format!("start {src}"));
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.events.lock().expect("events").push(format!("done {src}"));
        if src.contains("broken") {
            anyhow::bail!("load error");
        }
        Ok(())
    }

    fn run_inline(&self, script: &Script) {
        self.events
            .lock()
            .expect("events")
            .push(format!("inline {}", script.body.trim()));
    }
}

#[test]
fn split_scripts_preserves_order_and_attributes() {
    let html = r#"<form id="monthlyForm"></form>
<script src="a.js" defer></script>
<SCRIPT type='module'>init();</SCRIPT>
<p>tail</p>"#;
    let (markup, scripts) = split_scripts(html);

    assert!(!markup.to_ascii_lowercase().contains("<script"));
    assert!(markup.contains(r#"<form id="monthlyForm"></form>"#));
    assert!(markup.contains("<p>tail</p>"));
    assert_eq!(scripts.len(), 2);
    assert_eq!(scripts[0].src(), Some("a.js"));
    assert_eq!(scripts[0].attribute("defer"), Some(""));
    assert_eq!(scripts[1].src(), None);
    assert_eq!(scripts[1].attribute("type"), Some("module"));
    assert_eq!(scripts[1].body, "init();");
}

#[test]
fn warning_banner_escapes_markup() {
    let banner = warning_banner("form.html", "Failed <404>");
    assert!(banner.starts_with(r#"<div class="alert alert-warning p-2 mb-0">"#));
    assert!(banner.contains("Could not load form.html: Failed &lt;404&gt;"));
}

#[tokio::test]
async fn scripts_run_sequentially_in_document_order() {
    let fetcher = FakeFetcher {
        pages: HashMap::from([(
            "chart.html".to_string(),
            r#"<canvas id="monthlyChart"></canvas>
<script src="lib.js"></script><script>first()</script>
<script src="broken.js"></script><script>second()</script>"#
                .to_string(),
        )]),
    };
    let host = RecordingHost::default();
    let mut container = FakeContainer::including("chart.html");

    let outcome = include_into(&mut container, &fetcher, &host).await;

    assert_eq!(outcome, IncludeOutcome::Loaded { scripts: 4 });
    assert!(container.html.contains(r#"<canvas id="monthlyChart"></canvas>"#));
    assert_eq!(
        *host.events.lock().expect("events"),
        vec![
            "start lib.js",
            "done lib.js",
            "inline first()",
            "start broken.js",
            "done broken.js",
            "inline second()",
        ]
    );
}

#[tokio::test]
async fn failed_fragment_renders_warning_and_spares_siblings() {
    let fetcher = FakeFetcher {
        pages: HashMap::from([("form.html".to_string(), "<form></form>".to_string())]),
    };
    let host = RecordingHost::default();
    let mut containers = vec![
        FakeContainer::including("missing.html"),
        FakeContainer::including("form.html"),
        FakeContainer::default(),
    ];

    let outcomes = include_all(&mut containers, &fetcher, &host).await;

    assert!(matches!(
        &outcomes[0],
        IncludeOutcome::Failed { path, error } if path == "missing.html" && error.contains("404")
    ));
    assert_eq!(outcomes[1], IncludeOutcome::Loaded { scripts: 0 });
    assert_eq!(outcomes[2], IncludeOutcome::Skipped);
    assert!(containers[0]
        .html
        .contains("Could not load missing.html: Failed to load missing.html (404)"));
    assert_eq!(containers[1].html, "<form></form>");
    assert!(containers[2].html.is_empty());
}

async fn spawn_fragment_server() -> anyhow::Result<Url> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route(
            "/partials/form.html",
            get(|| async { "<form id=\"monthlyForm\"></form>" }),
        )
        .route(
            "/partials/gone.html",
            get(|| async { (StatusCode::NOT_FOUND, "nope") }),
        );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(Url::parse(&format!("http://{addr}/"))?)
}

#[tokio::test]
async fn http_fetcher_reads_fragment_and_reports_status() {
    let base = spawn_fragment_server().await.expect("spawn server");
    let fetcher = HttpFragmentFetcher::new(base);

    let html = fetcher.fetch("partials/form.html").await.expect("fragment");
    assert_eq!(html, "<form id=\"monthlyForm\"></form>");

    let err = fetcher
        .fetch("partials/gone.html")
        .await
        .expect_err("should fail");
    assert_eq!(err.to_string(), "Failed to load partials/gone.html (404)");
}
