//! Transaction Globe
//!
//! Live Bitcoin transactions drawn as glowing arcs over a 3D globe.
//!
//! # Architecture
//!
//! - **Stream**: `globe-stream` client feeding decoded transactions
//! - **Pipeline**: single owner of the arc scene, ticked at a fixed rate
//! - **Readiness**: texture and stream come up independently, combined
//!   into one display phase
//! - **Server**: page, texture, status API and a WebSocket of scene frames
//!
//! # Usage
//!
//! ```ignore
//! let config = VisConfig::from_env()?;
//! GlobeApp::new(config)
//!     .run(async { let _ = tokio::signal::ctrl_c().await; })
//!     .await?;
//! ```

mod app;
mod assets;
mod config;
mod diagnostics;
mod error;
mod frame;
mod pipeline;
mod readiness;
mod server;

pub use app::GlobeApp;
pub use assets::{load_texture, Texture};
pub use config::VisConfig;
pub use diagnostics::{DiagnosticEntry, DiagnosticLog};
pub use error::{Error, Result};
pub use frame::{ArcFrame, SceneFrame};
pub use pipeline::{AssetEvent, Directive, Pipeline};
pub use readiness::{AssetState, Phase, ReadinessGate};
pub use server::{AppState, VisServer};
