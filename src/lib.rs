//! Rollcall: notification client for the attendance tracker.
//!
//! Keeps an in-memory notification list consistent with the backend by
//! combining a REST snapshot with a WebSocket event stream.

pub mod auth;
pub mod config;
pub mod display;
pub mod errors;
pub mod grouping;
pub mod models;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod transport;
