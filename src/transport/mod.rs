//! Transport adapter: REST for snapshots and mutations, WebSocket for push.

pub mod push;
pub mod rest;
