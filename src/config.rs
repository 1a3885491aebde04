use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// REST root, e.g. `http://localhost:8000/api`.
    pub api_url: Url,
    /// Push root, e.g. `ws://localhost:8000`.
    pub ws_url: Url,
    /// JSON file holding the access token and user profile.
    pub credentials_path: PathBuf,
    pub request_timeout: Duration,
    /// Reconnect the push channel with backoff instead of dropping to
    /// fetch-only mode. Off by default.
    pub push_reconnect: bool,
    pub push_max_backoff: Duration,
    pub log_format: LogFormat,
}

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_CREDENTIALS_PATH: &str = ".rollcall/credentials.json";

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a config from any key lookup; `load()` passes the process env.
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let api_url = lookup("ROLLCALL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
    let api_url = Url::parse(&api_url).with_context(|| format!("ROLLCALL_API_URL is not a valid URL: {}", api_url))?;
    if !matches!(api_url.scheme(), "http" | "https") {
        anyhow::bail!("ROLLCALL_API_URL must be http or https, got {}", api_url.scheme());
    }

    let ws_url = match lookup("ROLLCALL_WS_URL") {
        Some(raw) => {
            let url = Url::parse(&raw).with_context(|| format!("ROLLCALL_WS_URL is not a valid URL: {}", raw))?;
            if !matches!(url.scheme(), "ws" | "wss") {
                anyhow::bail!("ROLLCALL_WS_URL must be ws or wss, got {}", url.scheme());
            }
            url
        }
        None => derive_ws_url(&api_url)?,
    };

    let log_format = match lookup("ROLLCALL_LOG_FORMAT").as_deref().map(str::trim) {
        Some("json") => LogFormat::Json,
        Some("text") | Some("") | None => LogFormat::Text,
        Some(other) => anyhow::bail!("ROLLCALL_LOG_FORMAT must be 'text' or 'json', got '{}'", other),
    };

    Ok(Config {
        api_url,
        ws_url,
        credentials_path: lookup("ROLLCALL_CREDENTIALS")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH)),
        request_timeout: Duration::from_secs(
            lookup("ROLLCALL_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        ),
        push_reconnect: lookup("ROLLCALL_PUSH_RECONNECT")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false),
        push_max_backoff: Duration::from_millis(
            lookup("ROLLCALL_PUSH_MAX_BACKOFF_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30_000),
        ),
        log_format,
    })
}

/// http(s)://host:port/anything -> ws(s)://host:port
fn derive_ws_url(api_url: &Url) -> anyhow::Result<Url> {
    let scheme = if api_url.scheme() == "https" { "wss" } else { "ws" };
    let host = api_url
        .host_str()
        .with_context(|| format!("API URL has no host: {}", api_url))?;
    let raw = match api_url.port() {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    };
    Url::parse(&raw).with_context(|| format!("cannot derive push URL from {}", api_url))
}
