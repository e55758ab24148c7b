//! Real-time collaboration room manager.
//!
//! Clients connect over WebSocket, join named rooms and exchange cursor, code and
//! state updates. The crate is layered as domain → usecase → infrastructure → ui.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
