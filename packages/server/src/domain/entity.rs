//! Core domain models for the collaboration room manager.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::value_object::{ClientId, RoomId, Timestamp};

/// Free-form shared application state attached to a room.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Prefix of generated participant names
pub const PLACEHOLDER_NAME_PREFIX: &str = "Guest";

/// A collaboration room with its participants and shared state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier
    pub id: RoomId,
    /// Display name
    pub name: String,
    /// Participants currently in the room, keyed by their id
    pub participants: HashMap<ClientId, Participant>,
    /// Shared state blob, merged last-write-wins
    pub metadata: Metadata,
    /// Timestamp when the room was created
    pub created_at: Timestamp,
}

impl Room {
    /// Create a new empty room. An empty or missing name falls back to the room id.
    pub fn new(id: RoomId, name: Option<String>, created_at: Timestamp) -> Self {
        let name = name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| id.as_str().to_string());
        Self {
            id,
            name,
            participants: HashMap::new(),
            metadata: Metadata::new(),
            created_at,
        }
    }

    /// Create a new empty room with initial metadata
    pub fn with_metadata(
        id: RoomId,
        name: Option<String>,
        metadata: Metadata,
        created_at: Timestamp,
    ) -> Self {
        Self {
            metadata,
            ..Self::new(id, name, created_at)
        }
    }

    /// Add a participant, replacing any previous entry with the same id.
    ///
    /// Returns the replaced participant, if any.
    pub fn add_participant(&mut self, participant: Participant) -> Option<Participant> {
        self.participants.insert(participant.id.clone(), participant)
    }

    /// Remove a participant from the room by ID
    pub fn remove_participant(&mut self, participant_id: &ClientId) -> Option<Participant> {
        self.participants.remove(participant_id)
    }

    /// Get a participant by ID
    pub fn get_participant(&self, participant_id: &ClientId) -> Option<&Participant> {
        self.participants.get(participant_id)
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Merge `patch` into the room metadata. Top-level keys in `patch` win.
    pub fn merge_metadata(&mut self, patch: Metadata) {
        for (key, value) in patch {
            self.metadata.insert(key, value);
        }
    }

    /// Snapshot of the ids that should receive a broadcast.
    ///
    /// Every current participant except `exclude`, sorted by id.
    pub fn broadcast_targets(&self, exclude: Option<&ClientId>) -> Vec<ClientId> {
        let mut targets: Vec<ClientId> = self
            .participants
            .keys()
            .filter(|id| Some(*id) != exclude)
            .cloned()
            .collect();
        targets.sort();
        targets
    }

    /// Participants ordered by join time, then by id
    pub fn participants_sorted(&self) -> Vec<Participant> {
        let mut participants: Vec<Participant> = self.participants.values().cloned().collect();
        participants.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        participants
    }
}

/// A participant bound to one connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant identifier (same as the connection's client_id)
    pub id: ClientId,
    /// Display name
    pub name: String,
    /// Whether this participant may originate state/code/chat updates
    pub is_publisher: bool,
    /// Timestamp when the participant joined the room
    pub joined_at: Timestamp,
}

impl Participant {
    /// Create a new participant.
    ///
    /// A missing or blank name is replaced by a generated placeholder.
    pub fn new(
        id: ClientId,
        name: Option<String>,
        is_publisher: bool,
        joined_at: Timestamp,
    ) -> Self {
        let name = name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| placeholder_name(&id));
        Self {
            id,
            name,
            is_publisher,
            joined_at,
        }
    }
}

/// Generated display name for participants that did not supply one
pub fn placeholder_name(id: &ClientId) -> String {
    let short: String = id.as_str().chars().take(8).collect();
    format!("{}-{}", PLACEHOLDER_NAME_PREFIX, short)
}
