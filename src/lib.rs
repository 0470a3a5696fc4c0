pub mod config;
pub mod event;
pub mod relay;
pub mod source;
pub mod utils;
pub mod webhook;

use reqwest::Client;
use tracing::info;

use config::RelayConfig;
use relay::{EventRelay, Watermark, WatermarkStore};
use source::EventApiClient;
use utils::shutdown::{shutdown_signal, StopHandle};
use utils::RelayError;
use webhook::SlackWebhook;

/// Relay wired to the HTTP event API and the Slack webhook
pub type HttpEventRelay = EventRelay<EventApiClient, SlackWebhook>;

/// Build the production relay from configuration.
///
/// Resolves the starting watermark from the state file when one is configured.
pub fn build_relay(config: &RelayConfig) -> Result<HttpEventRelay, RelayError> {
    let client = Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| RelayError::HttpClient(e.to_string()))?;

    let source = EventApiClient::new(&config.event_source_host, config.api_key.clone(), client.clone());
    let sink = SlackWebhook::with_client(config.webhook_url.clone(), client);

    let configured = Watermark::new(config.start_watermark);
    let store = config
        .watermark_state_file
        .as_ref()
        .map(|path| WatermarkStore::new(path.clone()));
    let start = match &store {
        Some(store) => store.resolve_start(configured)?,
        None => configured,
    };

    let mut relay = EventRelay::new(source, sink, start)
        .with_redaction(config.redaction.clone())
        .with_filter(config.search_filter.clone())
        .with_policy(config.advance_policy)
        .with_poll_interval(config.poll_interval());

    if let Some(store) = store {
        relay = relay.with_store(store);
    }

    Ok(relay)
}

/// Run the relay until SIGINT/SIGTERM.
pub async fn run(config: RelayConfig) -> Result<(), RelayError> {
    info!(config = ?config, "Starting event relay");

    let mut relay = build_relay(&config)?;

    let (stop_handle, stop) = StopHandle::new();
    tokio::spawn(async move {
        shutdown_signal().await;
        stop_handle.stop();
    });

    relay.run(stop).await
}
