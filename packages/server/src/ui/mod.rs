//! Collaboration server: HTTP/WebSocket handlers, frame routing and supervision.

mod handler;
mod heartbeat;
pub mod router;
mod server;
mod signal;
pub mod state;
pub mod validation;

pub use server::{COLLAB_PATH, Server};
pub use state::AppState;
