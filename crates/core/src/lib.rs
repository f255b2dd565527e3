//! # dexbridge core
//!
//! Shared building blocks for the exchange adapters:
//!
//! 1. **Fixed-point arithmetic** - exact decimals and venue base-unit scaling
//! 2. **Timing** - nanosecond timestamps and `PerfTimer`
//! 3. **ID generation** - nanoid ids and client order indices
//! 4. **Logging** - one-shot `tracing` subscriber setup

pub mod fixed;
pub mod id_gen;
pub mod logging;
pub mod timing;

pub use fixed::{Fixed, FixedError};
pub use id_gen::{generate_id_with_length, idgen_next_id, next_client_order_index};
pub use logging::init_logging;
pub use timing::{PerfTimer, Timestamp, nanos};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixed::{Fixed, FixedError};
    pub use crate::id_gen::{generate_id_with_length, idgen_next_id, next_client_order_index};
    pub use crate::logging::init_logging;
    pub use crate::timing::{PerfTimer, Timestamp, nanos};

    pub use chrono::{DateTime, Utc};
    pub use monoio;
    pub use serde::{Deserialize, Serialize};
}
