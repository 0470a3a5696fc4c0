use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use validator::Validate;

use crate::event::{RedactionList, SearchFilter};
use crate::relay::AdvancePolicy;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_DIR: &str = "logs";

/// 릴레이 설정
#[derive(Clone, Validate)]
pub struct RelayConfig {
    /// 이벤트 API 호스트 (FQDN 또는 `http(s)://` 로 시작하는 base URL)
    #[validate(length(min = 1))]
    pub event_source_host: String,
    #[validate(length(min = 1))]
    pub api_key: String,
    /// 재시작 시 이전 실행의 최대 이벤트 ID. 처음이면 0.
    pub start_watermark: i64,
    #[validate(range(min = 1))]
    pub poll_interval_secs: u64,
    #[validate(url)]
    pub webhook_url: String,
    pub redaction: RedactionList,
    pub search_filter: SearchFilter,
    pub advance_policy: AdvancePolicy,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
    pub watermark_state_file: Option<PathBuf>,
    pub log_dir: String,
}

impl RelayConfig {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 임의의 키 조회 함수로 설정 로드 (테스트에서 환경 변수를 건드리지 않기 위함)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        let event_source_host = get("EVENT_SOURCE_HOST").ok_or(ConfigError::Missing("EVENT_SOURCE_HOST"))?;
        let api_key = get("EVENT_SOURCE_API_KEY").ok_or(ConfigError::Missing("EVENT_SOURCE_API_KEY"))?;
        let webhook_url = get("WEBHOOK_URL").ok_or(ConfigError::Missing("WEBHOOK_URL"))?;

        let start_watermark = parse_or("START_WATERMARK", get("START_WATERMARK"), 0i64)?;
        let poll_interval_secs = parse_or(
            "POLL_INTERVAL_SECS",
            get("POLL_INTERVAL_SECS"),
            DEFAULT_POLL_INTERVAL_SECS,
        )?;
        let request_timeout_secs = parse_or(
            "REQUEST_TIMEOUT_SECS",
            get("REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let redaction = match get("REDACT_FIELDS") {
            Some(csv) => RedactionList::from_csv(&csv),
            None => RedactionList::default(),
        };

        let search_filter = match get("SEARCH_FILTER") {
            Some(json) => SearchFilter::from_json(&json)
                .map_err(|e| ConfigError::InvalidSearchFilter(e.to_string()))?,
            None => SearchFilter::default(),
        };

        let advance_policy = match get("ADVANCE_POLICY") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidAdvancePolicy(value))?,
            None => AdvancePolicy::default(),
        };

        let watermark_state_file = get("WATERMARK_STATE_FILE").map(PathBuf::from);
        let log_dir = get("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string());

        let config = Self {
            event_source_host,
            api_key,
            start_watermark,
            poll_interval_secs,
            webhook_url,
            redaction,
            search_filter,
            advance_policy,
            request_timeout_secs,
            watermark_state_file,
            log_dir,
        };

        config
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("event_source_host", &self.event_source_host)
            .field("api_key", &"<redacted>")
            .field("start_watermark", &self.start_watermark)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("webhook_url", &"<redacted>")
            .field("redaction", &self.redaction)
            .field("search_filter", &self.search_filter)
            .field("advance_policy", &self.advance_policy)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("watermark_state_file", &self.watermark_state_file)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        None => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("{key} must be an integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("SEARCH_FILTER must be a JSON object of key to list of values: {0}")]
    InvalidSearchFilter(String),
    #[error("ADVANCE_POLICY must be 'fetch' or 'delivery', got {0:?}")]
    InvalidAdvancePolicy(String),
    #[error("invalid configuration: {0}")]
    Validation(String),
}
