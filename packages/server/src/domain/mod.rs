//! Domain layer for the collaboration room manager.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod factory;
pub mod feature_store;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use entity::{Metadata, Participant, Room};
pub use error::{FeatureStoreError, MessagePushError, RepositoryError, ValueObjectError};
pub use factory::{ClientIdFactory, RoomIdFactory};
pub use feature_store::{FeatureFlags, FeatureStore};
#[cfg(test)]
pub use feature_store::MockFeatureStore;
pub use message_pusher::{MessagePusher, Outbound, PusherChannel};
pub use repository::{ConnectionRecord, ConnectionRepository, RemovedParticipant, RoomRepository};
pub use value_object::{ClientId, MessageContent, RoomId, Timestamp};
