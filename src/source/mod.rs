//! Event source abstraction
//!
//! The relay only needs one read call: every event after a watermark that
//! matches the search filter.

pub mod client;

use async_trait::async_trait;

use crate::event::{SearchFilter, SecurityEvent};
use crate::utils::SourceError;

pub use client::EventApiClient;

/// Read side of the relay.
///
/// Implementations return events with `id > after_id`, in the order the
/// upstream produced them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_after(
        &self,
        after_id: i64,
        filter: &SearchFilter,
    ) -> Result<Vec<SecurityEvent>, SourceError>;
}
