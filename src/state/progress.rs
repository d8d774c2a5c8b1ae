use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};

/// Index of the first room of a mission.
pub const FIRST_ROOM: u32 = 1;

/// Completion state of a single room within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomProgressEntry {
    /// The team solved the room.
    pub completed: bool,
    /// The team may enter the room.
    pub unlocked: bool,
}

/// Per-session progress keyed by 1-based room index.
///
/// Progress values are never mutated: every transition produces a new value whose
/// untouched entries are shared with the previous one, so older values handed out to
/// callers keep describing the state they were taken from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomProgress {
    rooms: BTreeMap<u32, Arc<RoomProgressEntry>>,
}

impl RoomProgress {
    /// Fresh progress for `room_count` rooms with only the first one unlocked.
    pub fn new(room_count: u32) -> Self {
        (FIRST_ROOM..=room_count)
            .map(|index| {
                let entry = RoomProgressEntry {
                    completed: false,
                    unlocked: index == FIRST_ROOM,
                };
                (index, entry)
            })
            .collect()
    }

    /// Entry for the room at `index`.
    pub fn get(&self, index: u32) -> Option<&RoomProgressEntry> {
        self.rooms.get(&index).map(Arc::as_ref)
    }

    /// Number of rooms tracked.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room is tracked.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Iterate rooms in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &RoomProgressEntry)> {
        self.rooms.iter().map(|(index, entry)| (*index, entry.as_ref()))
    }

    /// Lowest room the team can enter but has not solved yet.
    pub fn current_room(&self) -> Option<u32> {
        self.iter()
            .find(|(_, entry)| entry.unlocked && !entry.completed)
            .map(|(index, _)| index)
    }

    /// Whether every tracked room has been completed.
    pub fn is_mission_complete(&self) -> bool {
        !self.rooms.is_empty() && self.rooms.values().all(|entry| entry.completed)
    }
}

impl FromIterator<(u32, RoomProgressEntry)> for RoomProgress {
    fn from_iter<T: IntoIterator<Item = (u32, RoomProgressEntry)>>(iter: T) -> Self {
        Self {
            rooms: iter
                .into_iter()
                .map(|(index, entry)| (index, Arc::new(entry)))
                .collect(),
        }
    }
}

/// Mark `current_room_index` completed and unlock the room after it.
///
/// Completing a room that is not tracked returns an unchanged copy. Flags are only ever
/// raised, never cleared.
pub fn complete_room(progress: &RoomProgress, current_room_index: u32) -> RoomProgress {
    let mut next = progress.clone();

    let Some(current) = next.rooms.get_mut(&current_room_index) else {
        return next;
    };
    if !current.completed {
        *current = Arc::new(RoomProgressEntry {
            completed: true,
            ..**current
        });
    }

    let Some(following_index) = current_room_index.checked_add(1) else {
        return next;
    };
    if let Some(following) = next.rooms.get_mut(&following_index) {
        if !following.unlocked {
            *following = Arc::new(RoomProgressEntry {
                unlocked: true,
                ..**following
            });
        }
    }

    next
}
