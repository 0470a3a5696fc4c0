//! Relay loop and watermark tracking

pub mod processor;
pub mod watermark;

pub use processor::{CycleReport, EventRelay};
pub use watermark::{AdvancePolicy, Watermark, WatermarkStore};
