//! Switchboard gateway: HTTP/WebSocket server wiring the live chat
//! machinery (registry, queue, router) to clients and admins.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod live;
pub mod state;
