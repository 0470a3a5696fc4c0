//! HTTP client for the security-event search API
//!
//! `POST {base}/api/v1/events/search/?after_event_id={id}` with the search
//! filter as JSON body. Responses are paged through `last_id`.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::EventSource;
use crate::event::{SearchFilter, SecurityEvent};
use crate::utils::SourceError;

const SEARCH_PATH: &str = "/api/v1/events/search/";

/// Upper bound on how much of an error body ends up in logs
const MAX_ERROR_BODY_LEN: usize = 512;

/// One page of search results
#[derive(Debug, Deserialize)]
struct EventPage {
    #[serde(default)]
    events: Vec<Value>,
    #[serde(default)]
    last_id: Option<i64>,
}

/// Map a reqwest failure onto a source error category.
///
/// HTTP statuses are checked on the response itself, so only decode and
/// transport failures reach here.
fn classify_reqwest_error(error: reqwest::Error) -> SourceError {
    if error.is_decode() {
        SourceError::Parse(error.to_string())
    } else {
        SourceError::Transport(error.to_string())
    }
}

/// Build the API base URL from a configured host.
///
/// A bare host name becomes `https://{host}`; an explicit scheme is kept.
pub fn base_url_for_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Event search API client
#[derive(Debug, Clone)]
pub struct EventApiClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl EventApiClient {
    /// Create a client for the given host, sharing an existing reqwest client
    pub fn new(host: &str, api_key: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url_for_host(host),
            api_key: api_key.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self, after_id: i64) -> String {
        format!("{}{}?after_event_id={}", self.base_url, SEARCH_PATH, after_id)
    }

    /// Fetch a single page of events after `after_id`
    async fn fetch_page(
        &self,
        after_id: i64,
        filter: &SearchFilter,
    ) -> Result<EventPage, SourceError> {
        let response = self
            .client
            .post(self.search_url(after_id))
            .header(header::AUTHORIZATION, &self.api_key)
            .header(header::ACCEPT, "application/json")
            .json(filter)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SourceError::Auth {
                status: status.as_u16(),
            });
        }

        if status != StatusCode::OK {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(
                body.char_indices()
                    .nth(MAX_ERROR_BODY_LEN)
                    .map(|(idx, _)| idx)
                    .unwrap_or(body.len()),
            );
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<EventPage>()
            .await
            .map_err(classify_reqwest_error)
    }
}

#[async_trait]
impl EventSource for EventApiClient {
    #[instrument(skip(self, filter), fields(base_url = %self.base_url))]
    async fn fetch_after(
        &self,
        after_id: i64,
        filter: &SearchFilter,
    ) -> Result<Vec<SecurityEvent>, SourceError> {
        let mut cursor = after_id;
        let mut events = Vec::new();

        loop {
            let page = self.fetch_page(cursor, filter).await?;
            let page_len = page.events.len();

            for raw in page.events {
                events.push(SecurityEvent::from_value(raw)?);
            }

            debug!(cursor, page_len, last_id = ?page.last_id, "Fetched event page");

            if page_len == 0 {
                break;
            }

            match page.last_id {
                Some(next) if next > cursor => cursor = next,
                Some(next) => {
                    warn!(cursor, last_id = next, "Event source cursor did not advance, stopping pagination");
                    break;
                }
                None => break,
            }
        }

        Ok(events)
    }
}
