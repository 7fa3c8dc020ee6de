use anyhow::{Context, Result};
use reqwest::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
/// The `NEXT_PUBLIC_*` names are accepted so an existing web `.env` can be reused.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub ga_measurement_id: Option<String>,
    pub timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let raw_url = first_env(&["RESUMERISE_API_URL", "NEXT_PUBLIC_API_URL"])
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Config {
            api_url: parse_api_url(&raw_url)?,
            ga_measurement_id: first_env(&[
                "RESUMERISE_GA_MEASUREMENT_ID",
                "NEXT_PUBLIC_GA_MEASUREMENT_ID",
            ]),
            timeout_secs: match std::env::var("RESUMERISE_TIMEOUT_SECS") {
                Ok(v) => v
                    .parse::<u64>()
                    .context("RESUMERISE_TIMEOUT_SECS must be a whole number of seconds")?,
                Err(_) => DEFAULT_TIMEOUT_SECS,
            },
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Configuration pointing at an explicit backend, used by tests and `--api-url`.
    pub fn for_api_url(api_url: &str) -> Result<Self> {
        Ok(Config {
            api_url: parse_api_url(api_url)?,
            ga_measurement_id: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            rust_log: "info".to_string(),
        })
    }
}

fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

fn parse_api_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    Url::parse(trimmed).with_context(|| format!("API URL '{raw}' is not a valid URL"))
}
