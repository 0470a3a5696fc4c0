use std::path::PathBuf;

use crate::config::ConfigError;

/// 이벤트 조회(event source) 실패 분류
///
/// 루프는 어떤 분류든 로그만 남기고 "이번 주기 이벤트 0건"으로 처리합니다.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// 연결 실패, 타임아웃, 응답 본문 수신 중 I/O 에러
    #[error("event source transport error: {0}")]
    Transport(String),
    /// 401/403
    #[error("event source rejected credentials (HTTP {status})")]
    Auth { status: u16 },
    /// 그 밖의 200 이외 응답
    #[error("event source returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// 응답 본문이 예상한 형식이 아님
    #[error("event source response could not be parsed: {0}")]
    Parse(String),
}

impl SourceError {
    /// 로그 필드용 분류 이름
    pub fn category(&self) -> &'static str {
        match self {
            SourceError::Transport(_) => "transport",
            SourceError::Auth { .. } => "auth",
            SourceError::Status { .. } => "status",
            SourceError::Parse(_) => "parse",
        }
    }
}

/// 웹훅 전송 실패 분류
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// 요청 자체가 실패한 경우. 루프는 이 분류만 잡고 다음 이벤트로 넘어갑니다.
    #[error("webhook transport error: {0}")]
    Transport(String),
    /// 이벤트를 JSON 텍스트로 만들지 못한 경우. 루프 밖으로 전파됩니다.
    #[error("failed to serialize event {event_id}: {reason}")]
    Serialize { event_id: i64, reason: String },
}

/// 워터마크 상태 파일 에러
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to read watermark state file {path}: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("failed to parse watermark state file {path}: {content:?}")]
    Parse { path: PathBuf, content: String },
    #[error("failed to write watermark state file {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// 애플리케이션 최상위 에러 타입
///
/// 릴레이 루프를 멈추게 하는 에러만 여기에 모입니다.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
