use std::process::ExitCode;

use event_relay::config::RelayConfig;
use event_relay::utils::logging::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    // 1. 환경변수 로드
    dotenvy::dotenv().ok();

    // 2. 설정 로드
    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // 3. 로깅 초기화 (guard는 main이 끝날 때까지 유지)
    let _guard = init_logging(&config.log_dir);

    // 4. 릴레이 실행
    match event_relay::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Event relay stopped with error");
            ExitCode::FAILURE
        }
    }
}
