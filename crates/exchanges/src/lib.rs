//! # dexbridge exchange integrations
//!
//! Venue adapters behind one trait, [`ExchangeClient`], so trading code can
//! swap exchanges without changes.
//!
//! ## Architecture
//!
//! - **monoio HTTP/WebSocket clients** - single-threaded async over rustls
//! - **Fixed-point arithmetic** - exact decimals, venue base-unit scaling
//! - **Shared retry** - read paths degrade to logged sentinels
//! - **Lighter** - market metadata cache, unit conversion, signing seam and
//!   account stream (feature `lighter`, on by default)

pub mod errors;
pub mod http;
pub mod retry;
pub mod traits;
pub mod types;
pub mod websocket;

#[cfg(feature = "lighter")]
pub mod lighter;

pub use errors::{ExchangeError, Result};
pub use http::{HttpResponse, HttpTransport, MonoioHttpsClient};
pub use retry::{RetryPolicy, query_retry, retry};
pub use traits::{ExchangeClient, OrderUpdateHandler};
pub use types::*;
pub use websocket::MonoioWebSocket;

#[cfg(feature = "lighter")]
pub use lighter::{LighterClient, LighterConfig, TxSigner};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::errors::{ExchangeError, Result};
    pub use crate::http::{HttpTransport, MonoioHttpsClient};
    pub use crate::retry::RetryPolicy;
    pub use crate::traits::{ExchangeClient, OrderUpdateHandler};
    pub use crate::types::*;
    pub use dexbridge_core::prelude::*;

    #[cfg(feature = "lighter")]
    pub use crate::lighter::{LighterClient, LighterConfig, TxSigner};
}
