use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_SESSION_FILE: &str = "./session.json";
pub const DEFAULT_CONFIG_FILE: &str = "./config.json";
pub const DEFAULT_OTP_COUNTDOWN_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Optional on-disk runtime config (`config.json`). Every field may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfigFile {
    pub api_base_url: Option<String>,
    pub session_file: Option<PathBuf>,
    pub otp_countdown_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub otp_countdown_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            otp_countdown_secs: DEFAULT_OTP_COUNTDOWN_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl RuntimeConfig {
    /// Resolve configuration: environment first, then `config.json`, then defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let path = env::var("SMSGATE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let file = read_config_file(&path)?;
        Self::resolve(|key| env::var(key).ok(), file)
    }

    fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        file: Option<RuntimeConfigFile>,
    ) -> anyhow::Result<Self> {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        let api_base_url = lookup("SMSGATE_API_BASE_URL")
            .or(file.api_base_url)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);
        if api_base_url.is_empty() {
            return Err(anyhow!("SMSGATE_API_BASE_URL must not be empty"));
        }

        let session_file = lookup("SMSGATE_SESSION_FILE")
            .map(PathBuf::from)
            .or(file.session_file)
            .unwrap_or(defaults.session_file);

        let otp_countdown_secs = match lookup("SMSGATE_OTP_COUNTDOWN_SECS") {
            Some(raw) => parse_secs("SMSGATE_OTP_COUNTDOWN_SECS", &raw)?,
            None => file
                .otp_countdown_secs
                .unwrap_or(defaults.otp_countdown_secs),
        };

        let request_timeout_secs = match lookup("SMSGATE_REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_secs("SMSGATE_REQUEST_TIMEOUT_SECS", &raw)?,
            None => file
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
        };
        if request_timeout_secs == 0 {
            return Err(anyhow!("SMSGATE_REQUEST_TIMEOUT_SECS must be positive"));
        }

        Ok(Self {
            api_base_url,
            session_file,
            otp_countdown_secs,
            request_timeout_secs,
        })
    }
}

fn parse_secs(key: &str, raw: &str) -> anyhow::Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", key, raw))
}

fn read_config_file(path: &str) -> anyhow::Result<Option<RuntimeConfigFile>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("Failed to read {}", path)),
    };
    let parsed = serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path))?;
    Ok(Some(parsed))
}
