//! HTTP API: configuration, service wiring, and request/response mapping.

pub mod app;
pub mod config;
