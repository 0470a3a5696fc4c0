pub mod error;
pub mod logging;
pub mod shutdown;

pub use error::{DeliveryError, RelayError, SourceError, StateError};
