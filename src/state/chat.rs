//! Chat feed records emitted while a mission is running.

use std::{
    sync::{Mutex, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, macros::format_description};

/// Role attached to every system message.
pub const MISSION_CONTROL_ROLE: &str = "MISSION-CONTROL";
/// Label prepended to the content of team input messages.
pub const TEAM_INPUT_PREFIX: &str = "✅ INPUT RECEIVED: ";

const ID_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 10;

/// Kind of chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    /// Narration from mission control.
    System,
    /// Acknowledgement of an input submitted by a team role.
    TeamInput,
}

/// A single entry of the mission chat feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Identifier unique within the process.
    pub id: String,
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Speaker shown next to the message.
    pub role: String,
    /// Message body.
    pub content: String,
    /// Human-readable local time the message was created.
    pub timestamp: String,
}

/// Source of the random part of message identifiers.
///
/// Identifiers are `<epoch millis in base36>-<random base36 suffix>`. The seeded variant
/// produces a reproducible suffix sequence for tests.
#[derive(Debug, Default)]
pub enum MessageIds {
    /// Suffixes drawn from the thread-local generator.
    #[default]
    Random,
    /// Suffixes drawn from a seeded generator.
    Seeded(Mutex<StdRng>),
}

impl MessageIds {
    /// Identifier source backed by the thread-local generator.
    pub fn random() -> Self {
        Self::Random
    }

    /// Identifier source with a deterministic suffix sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::Seeded(Mutex::new(StdRng::seed_from_u64(seed)))
    }

    /// Allocate a new message identifier.
    pub fn next_id(&self) -> String {
        let suffix = match self {
            Self::Random => random_suffix(&mut rand::rng()),
            Self::Seeded(rng) => {
                let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
                random_suffix(&mut *rng)
            }
        };
        format!("{}-{suffix}", to_base36(now_millis()))
    }

    /// Build a mission control message.
    pub fn system_message(&self, content: impl Into<String>) -> ChatMessage {
        ChatMessage {
            id: self.next_id(),
            kind: MessageKind::System,
            role: MISSION_CONTROL_ROLE.to_owned(),
            content: content.into(),
            timestamp: local_clock_time(),
        }
    }

    /// Build the acknowledgement for `input_key` submitted by `role`.
    pub fn team_input_message(&self, role: &str, input_key: &str) -> ChatMessage {
        ChatMessage {
            id: self.next_id(),
            kind: MessageKind::TeamInput,
            role: role.to_uppercase(),
            content: format!("{TEAM_INPUT_PREFIX}{}", input_label(input_key)),
            timestamp: local_clock_time(),
        }
    }
}

/// Build a mission control message with a random identifier.
pub fn system_message(content: impl Into<String>) -> ChatMessage {
    MessageIds::random().system_message(content)
}

/// Build a team input acknowledgement with a random identifier.
pub fn team_input_message(role: &str, input_key: &str) -> ChatMessage {
    MessageIds::random().team_input_message(role, input_key)
}

/// `oxygen-levels` becomes `OXYGEN LEVELS`.
fn input_label(input_key: &str) -> String {
    input_key.replace('-', " ").to_uppercase()
}

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())]))
        .collect()
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".into();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ID_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.iter().rev().map(|digit| char::from(*digit)).collect()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// Local wall-clock time such as `9:05:17 PM`, in UTC when the offset is unknown.
fn local_clock_time() -> String {
    let format = format_description!("[hour repr:12 padding:none]:[minute]:[second] [period]");
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(format)
        .unwrap_or_else(|_| "--:--:--".into())
}
