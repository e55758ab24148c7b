//! CLI client for the collaboration server.
//!
//! The [`session`] driver owns the WebSocket and applies the effects computed by the
//! pure [`reconnect`] controller; the binary only deals with lines and events.

pub mod command;
pub mod error;
pub mod formatter;
pub mod reconnect;
pub mod session;
pub mod ui;
