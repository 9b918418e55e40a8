//! Live chat machinery: connection registry, waiting queue, router, and
//! the two WebSocket endpoints.

pub mod admin_ws;
pub mod auth;
pub mod client_ws;
pub mod queue;
pub mod registry;
pub mod router;
