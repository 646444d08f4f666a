// Server side of the court-side display: configuration, poll handling and
// the WebSocket endpoint.

pub mod config;
pub mod service;
pub mod ws_server;
