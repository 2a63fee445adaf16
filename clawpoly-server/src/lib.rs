//! HTTP server for the `ClawPoly` pay-per-query Polygon read API.
//!
//! Paid search routes sit behind an x402 paygate and return proof-carrying
//! envelopes; free routes list the endpoint catalogue, search the bundled
//! docs and report chain health. Every route except health is rate limited.
//!
//! # Modules
//!
//! - [`config`] - TOML configuration with environment variable expansion
//! - [`state`] - Wiring of chain, explorer, paygate and receipt collaborators
//! - [`routes`] - Router assembly and layer ordering
//! - [`handlers`] - Axum route handlers
//! - [`envelope`] - Proof bundle and receipt attached to paid responses
//! - [`docs`] - In-memory documentation search
//! - [`error`] - Handler error type and its JSON rendering
//! - [`util`] - Shutdown signal handling

pub mod config;
pub mod docs;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod util;

pub use routes::router;
pub use state::{AppState, SharedState};
