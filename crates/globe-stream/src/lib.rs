//! Live unconfirmed-transaction feed for the globe.
//!
//! # Architecture
//!
//! - **Message**: decodes `utx` frames into [`Transaction`]s, drops the rest
//! - **Backoff**: linear `base × attempt` schedule with a fixed budget
//! - **Client**: owned connection task with a single callback slot
//!
//! # Usage
//!
//! ```ignore
//! let mut client = StreamClient::default();
//! client.on_event(|tx| println!("{} sat", tx.value));
//! client.connect();
//! ```

pub mod backoff;
pub mod client;
pub mod error;
pub mod message;
pub mod types;

pub use backoff::ReconnectPolicy;
pub use client::{ConnectionState, EventHandler, StreamClient, StreamConfig, DEFAULT_STREAM_URL};
pub use error::{Error, Result};
pub use types::{GeoPoint, Transaction, SATOSHIS_PER_BTC};
