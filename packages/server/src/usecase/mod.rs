//! UseCase layer.
//!
//! Each use case mutates the room directory or the connection registry and returns
//! what happened (snapshots and broadcast targets). Turning that into frames and
//! delivering them is the job of the UI layer.

pub mod connect_participant;
pub mod create_room;
pub mod disconnect_participant;
pub mod error;
pub mod forward_message;
pub mod get_participants;
pub mod get_room_detail;
pub mod get_rooms;
pub mod heartbeat;
pub mod join_room;
pub mod leave_room;
pub mod membership;
pub mod send_message;
pub mod update_code;
pub mod update_cursor;
pub mod update_features;
pub mod update_state;

#[cfg(test)]
pub(crate) mod testing;

pub use connect_participant::ConnectParticipantUseCase;
pub use create_room::CreateRoomUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::CollabError;
pub use forward_message::ForwardMessageUseCase;
pub use get_participants::GetParticipantsUseCase;
pub use get_room_detail::GetRoomDetailUseCase;
pub use get_rooms::GetRoomsUseCase;
pub use heartbeat::HeartbeatUseCase;
pub use join_room::{JoinOutcome, JoinRequest, JoinRoomUseCase};
pub use leave_room::LeaveRoomUseCase;
pub use membership::{LeaveOutcome, Membership, RoomBroadcast};
pub use send_message::{ChatOutcome, SendMessageUseCase};
pub use update_code::UpdateCodeUseCase;
pub use update_cursor::UpdateCursorUseCase;
pub use update_features::UpdateFeaturesUseCase;
pub use update_state::{StateOutcome, UpdateStateUseCase};
