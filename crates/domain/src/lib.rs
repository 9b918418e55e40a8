//! Shared domain types for Switchboard: session and message records, the
//! common error type, configuration, and structured trace events.

pub mod config;
pub mod error;
pub mod trace;
pub mod types;
