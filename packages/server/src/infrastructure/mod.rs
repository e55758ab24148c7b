//! Infrastructure layer: in-memory stores, WebSocket pusher and wire DTOs.

pub mod dto;
pub mod feature_store;
pub mod message_pusher;
pub mod repository;
