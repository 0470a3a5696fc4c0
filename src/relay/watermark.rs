//! Watermark state and its optional on-disk copy

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};

use crate::utils::StateError;

/// Highest event id already handled. Never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Watermark(i64);

impl Watermark {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Move to `max(self, id)`. Returns true if the value changed.
    pub fn advance(&mut self, id: i64) -> bool {
        if id > self.0 {
            self.0 = id;
            true
        } else {
            false
        }
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// When the watermark moves past an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvancePolicy {
    /// Every fetched event moves the watermark, delivered or not.
    /// A failed delivery is never retried.
    #[default]
    AdvanceOnFetch,
    /// Only delivered events below the first failed id move the watermark,
    /// so failed events are fetched again next cycle.
    AdvanceOnDelivery,
}

impl AdvancePolicy {
    /// Watermark after a batch, given `(id, delivered)` outcomes in processing order.
    pub fn settle(&self, current: Watermark, outcomes: &[(i64, bool)]) -> Watermark {
        let mut next = current;
        match self {
            AdvancePolicy::AdvanceOnFetch => {
                for (id, _) in outcomes {
                    next.advance(*id);
                }
            }
            AdvancePolicy::AdvanceOnDelivery => {
                let first_failed = outcomes
                    .iter()
                    .filter(|(_, delivered)| !delivered)
                    .map(|(id, _)| *id)
                    .min();

                for (id, delivered) in outcomes {
                    let below_failure = first_failed.map_or(true, |failed| *id < failed);
                    if *delivered && below_failure {
                        next.advance(*id);
                    }
                }
            }
        }
        next
    }
}

impl FromStr for AdvancePolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fetch" | "advance_on_fetch" | "advance-on-fetch" => Ok(AdvancePolicy::AdvanceOnFetch),
            "delivery" | "advance_on_delivery" | "advance-on-delivery" => {
                Ok(AdvancePolicy::AdvanceOnDelivery)
            }
            _ => Err("invalid advance policy: expected 'fetch' or 'delivery'"),
        }
    }
}

/// Plain-text file holding the last watermark, one integer.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored watermark. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<Watermark>, StateError> {
        if !self.path.exists() {
            debug!(file = %self.path.display(), "Watermark state file does not exist yet");
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| StateError::Read {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let value = content.trim().parse::<i64>().map_err(|_| StateError::Parse {
            path: self.path.clone(),
            content: content.clone(),
        })?;

        Ok(Some(Watermark::new(value)))
    }

    /// Replace the stored watermark through a temp file and rename.
    pub fn save(&self, watermark: Watermark) -> Result<(), StateError> {
        let write_err = |e: std::io::Error| StateError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, watermark.to_string()).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;

        debug!(watermark = watermark.value(), "Saved watermark");
        Ok(())
    }

    /// Pick the starting watermark: the stored one if it is ahead of the configured one.
    pub fn resolve_start(&self, configured: Watermark) -> Result<Watermark, StateError> {
        match self.load()? {
            Some(stored) if stored > configured => {
                info!(
                    stored = stored.value(),
                    configured = configured.value(),
                    "Resuming from stored watermark"
                );
                Ok(stored)
            }
            _ => Ok(configured),
        }
    }
}
