use std::{env, time::Duration};

use crate::{domain::ChannelId, errors::Error, Result};

const DEFAULT_SOURCE_BASE_URL: &str = "https://yande.re";
const DEFAULT_SOURCE_TAGS: &str = "order:random";
const DEFAULT_CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";
const DEFAULT_D1_TABLE: &str = "images";

/// Typed configuration, read from the process environment (and `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub channel_id: ChannelId,
    pub telegram_api_url: Option<String>,

    // Cloudflare
    pub cf_account_id: String,
    pub cf_api_token: String,
    pub cf_api_base: String,

    // R2
    pub r2_access_key: String,
    pub r2_secret_key: String,
    pub r2_bucket: String,
    /// `None` when neither `R2_ENDPOINT` nor an account id is set.
    pub r2_endpoint: Option<String>,

    // D1
    pub d1_database_id: String,
    pub d1_table: String,

    // Image source
    pub source_base_url: String,
    pub source_tags: String,

    // Runtime
    pub post_interval: Duration,
    pub http_timeout: Duration,
    pub recent_capacity: usize,

    /// Required variables that were absent or empty. Reported at startup, not fatal.
    pub missing: Vec<&'static str>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Existing env always wins over `.env`.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);
        let mut missing = Vec::new();
        let mut required = |key: &'static str| {
            get(key).unwrap_or_else(|| {
                missing.push(key);
                String::new()
            })
        };

        let bot_token = required("BOT_TOKEN");
        let cf_api_token = required("CLOUDFLARE_API_TOKEN");
        let r2_access_key = required("R2_ACCESS_KEY_ID");
        let r2_secret_key = required("R2_SECRET_ACCESS_KEY");
        let r2_bucket = required("R2_BUCKET_NAME");
        let d1_database_id = required("D1_DATABASE_ID");

        let cf_account_id = match get("CLOUDFLARE_ACCOUNT_ID").or_else(|| get("R2_ACCOUNT_ID")) {
            Some(v) => v,
            None => {
                missing.push("CLOUDFLARE_ACCOUNT_ID");
                String::new()
            }
        };

        // The channel id is the one value we cannot run without.
        let channel_id = parse_channel_id(get("CHANNEL_ID"))?;

        let r2_endpoint = get("R2_ENDPOINT")
            .or_else(|| {
                (!cf_account_id.is_empty())
                    .then(|| format!("https://{cf_account_id}.r2.cloudflarestorage.com"))
            })
            .map(|url| url.trim_end_matches('/').to_string());

        let d1_table = get("D1_TABLE").unwrap_or_else(|| DEFAULT_D1_TABLE.to_string());
        validate_identifier(&d1_table)?;

        let cf_api_base = get("CLOUDFLARE_API_BASE")
            .unwrap_or_else(|| DEFAULT_CLOUDFLARE_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let source_base_url = get("SOURCE_BASE_URL")
            .unwrap_or_else(|| DEFAULT_SOURCE_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let source_tags = get("SOURCE_TAGS").unwrap_or_else(|| DEFAULT_SOURCE_TAGS.to_string());

        let env_u64 = |key: &str| parse_u64(key, get(key));
        let post_interval = Duration::from_secs(env_u64("POST_INTERVAL_SECS")?.unwrap_or(60).max(1));
        let http_timeout = Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS")?.unwrap_or(30).max(1));
        let recent_capacity = env_u64("RECENT_POSTS_CAPACITY")?.unwrap_or(500) as usize;

        Ok(Self {
            bot_token,
            channel_id,
            telegram_api_url: get("TELEGRAM_API_URL"),
            cf_account_id,
            cf_api_token,
            cf_api_base,
            r2_access_key,
            r2_secret_key,
            r2_bucket,
            r2_endpoint,
            d1_database_id,
            d1_table,
            source_base_url,
            source_tags,
            post_interval,
            http_timeout,
            recent_capacity,
            missing,
        })
    }
}

fn parse_channel_id(v: Option<String>) -> Result<ChannelId> {
    let raw = v.ok_or_else(|| {
        Error::Config("CHANNEL_ID environment variable is required".to_string())
    })?;
    raw.trim()
        .parse::<i64>()
        .map(ChannelId)
        .map_err(|_| Error::Config(format!("CHANNEL_ID must be an integer, got {raw:?}")))
}

fn parse_u64(key: &str, v: Option<String>) -> Result<Option<u64>> {
    v.map(|s| {
        s.trim()
            .parse::<u64>()
            .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {s:?}")))
    })
    .transpose()
}

/// Table names are spliced into SQL, so only plain identifiers are accepted.
fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Ok(());
    }
    Err(Error::Config(format!(
        "D1_TABLE must be a plain SQL identifier, got {name:?}"
    )))
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}
