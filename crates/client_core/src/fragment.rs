//! Loads HTML fragments into page containers.

use std::sync::OnceLock;

use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use reqwest::{header, Client};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("Failed to load {path} ({status})")]
    Status { path: String, status: u16 },
    #[error("invalid fragment path {path}: {source}")]
    InvalidPath {
        path: String,
        source: url::ParseError,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait FragmentFetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<String, FragmentError>;
}

/// Fetches fragments over HTTP relative to `base_url`, bypassing caches.
pub struct HttpFragmentFetcher {
    http: Client,
    base_url: Url,
}

impl HttpFragmentFetcher {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl FragmentFetcher for HttpFragmentFetcher {
    async fn fetch(&self, path: &str) -> Result<String, FragmentError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|source| FragmentError::InvalidPath {
                path: path.to_string(),
                source,
            })?;
        let res = self
            .http
            .get(url)
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(FragmentError::Status {
                path: path.to_string(),
                status: res.status().as_u16(),
            });
        }
        Ok(res.text().await?)
    }
}

pub trait FragmentContainer: Send {
    fn include_path(&self) -> Option<String>;
    fn replace_content(&mut self, html: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub attributes: Vec<(String, String)>,
    pub body: String,
}

impl Script {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn src(&self) -> Option<&str> {
        self.attribute("src").filter(|src| !src.is_empty())
    }
}

#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Loads an external script; returns once it has loaded or failed.
    async fn load_external(&self, script: &Script) -> anyhow::Result<()>;
    fn run_inline(&self, script: &Script);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeOutcome {
    Skipped,
    Loaded { scripts: usize },
    Failed { path: String, error: String },
}

fn script_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").expect("script regex")
    })
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
            .expect("attribute regex")
    })
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    attribute_regex()
        .captures_iter(raw)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

/// Splits `<script>` elements out of `html`, keeping their document order.
/// Returns the remaining markup and the scripts.
pub fn split_scripts(html: &str) -> (String, Vec<Script>) {
    let mut scripts = Vec::new();
    let markup = script_regex()
        .replace_all(html, |caps: &regex::Captures<'_>| {
            scripts.push(Script {
                attributes: parse_attributes(&caps[1]),
                body: caps[2].to_string(),
            });
            ""
        })
        .into_owned();
    (markup, scripts)
}

pub fn warning_banner(path: &str, error: &str) -> String {
    format!(
        r#"<div class="alert alert-warning p-2 mb-0">Could not load {}: {}</div>"#,
        escape_html(path),
        escape_html(error)
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Fetches the container's fragment, injects its markup, then hands its
/// scripts to `host` one at a time. Failures end up as a warning banner in
/// the container.
pub async fn include_into<C, F, H>(container: &mut C, fetcher: &F, host: &H) -> IncludeOutcome
where
    C: FragmentContainer + ?Sized,
    F: FragmentFetcher + ?Sized,
    H: ScriptHost + ?Sized,
{
    let Some(path) = container.include_path().filter(|p| !p.is_empty()) else {
        return IncludeOutcome::Skipped;
    };

    let html = match fetcher.fetch(&path).await {
        Ok(html) => html,
        Err(error) => {
            let error = error.to_string();
            warn!(%path, %error, "fragment load failed");
            container.replace_content(&warning_banner(&path, &error));
            return IncludeOutcome::Failed { path, error };
        }
    };

    let (markup, scripts) = split_scripts(&html);
    container.replace_content(&markup);

    for script in &scripts {
        if let Some(src) = script.src() {
            if let Err(error) = host.load_external(script).await {
                debug!(%path, src, %error, "fragment script failed to load");
            }
        } else {
            host.run_inline(script);
        }
    }

    debug!(%path, scripts = scripts.len(), "fragment loaded");
    IncludeOutcome::Loaded {
        scripts: scripts.len(),
    }
}

/// Loads every container concurrently; outcomes are in container order.
pub async fn include_all<C, F, H>(containers: &mut [C], fetcher: &F, host: &H) -> Vec<IncludeOutcome>
where
    C: FragmentContainer,
    F: FragmentFetcher + ?Sized,
    H: ScriptHost + ?Sized,
{
    join_all(
        containers
            .iter_mut()
            .map(|container| include_into(container, fetcher, host)),
    )
    .await
}

#[cfg(test)]
#[path = "tests/fragment_tests.rs"]
mod tests;
