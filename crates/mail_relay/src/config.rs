use std::{collections::HashMap, fs, path::PathBuf};

use shared::protocol::DEFAULT_RELAY_PORT;
use thiserror::Error;
use tracing::warn;

pub const CONFIG_FILE: &str = "mail_relay.toml";
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub max_json_bytes: usize,
    pub mail: MailSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub from: Option<String>,
    pub to_fallback: Option<String>,
    pub smtp_url: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_secure: bool,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub outbox_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: bind_addr_for_port(DEFAULT_RELAY_PORT),
            max_json_bytes: 2 * 1024 * 1024,
            mail: MailSettings::default(),
        }
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            from: None,
            to_fallback: None,
            smtp_url: None,
            smtp_host: None,
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_secure: false,
            smtp_user: None,
            smtp_pass: None,
            outbox_dir: PathBuf::from("./outbox"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid size {0:?}")]
    InvalidSize(String),
    #[error("invalid port {0:?}")]
    InvalidPort(String),
}

fn bind_addr_for_port(port: u16) -> String {
    format!("0.0.0.0:{port}")
}

/// Parses sizes such as `512`, `100kb`, `2mb` or `1.5mb` into bytes.
pub fn parse_size(raw: &str) -> Result<usize, ConfigError> {
    let normalized = raw.trim().to_ascii_lowercase();
    let split = normalized
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(normalized.len());
    let (number, unit) = normalized.split_at(split);
    let multiplier: f64 = match unit.trim() {
        "" | "b" => 1.0,
        "kb" => 1024.0,
        "mb" => 1024.0 * 1024.0,
        "gb" => 1024.0 * 1024.0 * 1024.0,
        _ => return Err(ConfigError::InvalidSize(raw.to_string())),
    };
    let value: f64 = number
        .parse()
        .map_err(|_| ConfigError::InvalidSize(raw.to_string()))?;
    Ok((value * multiplier).floor() as usize)
}

pub fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Applies one layer of settings. Keys are the lowercase forms of the
/// environment variable names.
fn apply_layer(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("port") {
        match parse_port(&v) {
            Ok(port) => settings.bind_addr = bind_addr_for_port(port),
            Err(err) => warn!(%err, "ignoring PORT"),
        }
    }
    if let Some(v) = lookup("bind_addr").and_then(|v| non_empty(&v)) {
        settings.bind_addr = v;
    }
    if let Some(v) = lookup("max_json") {
        match parse_size(&v) {
            Ok(bytes) => settings.max_json_bytes = bytes,
            Err(err) => warn!(%err, "ignoring MAX_JSON"),
        }
    }

    let mail = &mut settings.mail;
    if let Some(v) = lookup("mail_from") {
        mail.from = non_empty(&v);
    }
    if let Some(v) = lookup("mail_to") {
        mail.to_fallback = non_empty(&v);
    }
    if let Some(v) = lookup("smtp_url") {
        mail.smtp_url = non_empty(&v);
    }
    if let Some(v) = lookup("smtp_host") {
        mail.smtp_host = non_empty(&v);
    }
    if let Some(v) = lookup("smtp_port") {
        match parse_port(&v) {
            Ok(port) => mail.smtp_port = port,
            Err(err) => warn!(%err, "ignoring SMTP_PORT"),
        }
    }
    if let Some(v) = lookup("smtp_secure") {
        mail.smtp_secure = v.trim().eq_ignore_ascii_case("true");
    }
    if let Some(v) = lookup("smtp_user") {
        mail.smtp_user = non_empty(&v);
    }
    if let Some(v) = lookup("smtp_pass") {
        mail.smtp_pass = (!v.is_empty()).then_some(v);
    }
    if let Some(v) = lookup("mail_outbox_dir").and_then(|v| non_empty(&v)) {
        mail.outbox_dir = PathBuf::from(v);
    }
}

fn env_key(key: &str) -> String {
    match key {
        "bind_addr" => "APP__BIND_ADDR".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

/// Defaults, then the optional config file table, then the environment.
pub fn settings_from_sources(
    file_cfg: &HashMap<String, String>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();
    apply_layer(&mut settings, |key| file_cfg.get(key).cloned());
    apply_layer(&mut settings, |key| env(&env_key(key)));
    settings
}

pub fn load_settings() -> Settings {
    let file_cfg = fs::read_to_string(CONFIG_FILE)
        .ok()
        .and_then(|raw| match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(cfg) => Some(cfg),
            Err(err) => {
                warn!(%err, file = CONFIG_FILE, "ignoring unreadable config file");
                None
            }
        })
        .unwrap_or_default();
    settings_from_sources(&file_cfg, |key| std::env::var(key).ok())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
