//! Domain factories for creating domain entities and value objects.

use super::{ClientId, RoomId, error::ValueObjectError};

/// Factory for generating RoomId instances.
///
/// Used when a client creates or joins a room without supplying an id.
pub struct RoomIdFactory;

impl RoomIdFactory {
    /// Generate a new RoomId with a random UUID v4.
    ///
    /// # Errors
    ///
    /// This method should not fail in practice, but returns Result for consistency
    /// with the domain error handling pattern.
    pub fn generate() -> Result<RoomId, ValueObjectError> {
        RoomId::new(uuid::Uuid::new_v4().to_string())
    }
}

/// Factory for generating ClientId instances for newly accepted connections.
pub struct ClientIdFactory;

impl ClientIdFactory {
    /// Generate a new process-unique ClientId with a random UUID v4.
    pub fn generate() -> Result<ClientId, ValueObjectError> {
        ClientId::new(uuid::Uuid::new_v4().to_string())
    }
}
