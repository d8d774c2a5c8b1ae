//! Room progression engine: pure functions over room definitions, progress and chat.

/// Chat feed messages and identifier generation.
pub mod chat;
/// Mission timer rendering.
pub mod clock;
/// Room completion and unlocking.
pub mod progress;
/// Room unlock conditions.
pub mod room;

pub use self::chat::{
    ChatMessage, MessageIds, MessageKind, system_message, team_input_message,
};
pub use self::clock::format_duration;
pub use self::progress::{RoomProgress, RoomProgressEntry, complete_room};
pub use self::room::{PlayerInputs, RoomDefinition, has_all_inputs};
