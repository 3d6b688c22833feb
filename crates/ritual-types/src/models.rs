use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::TimeOfDay;

/// A recurring action a user intends to perform.
///
/// `related_habit` is a weak self-reference: deleting the referenced habit
/// nulls the field, it never cascades. `reward` is always `None` or a
/// non-empty string; the empty string is normalised away at the API edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub place: String,
    pub time: TimeOfDay,
    pub action: String,
    pub is_pleasant: bool,
    pub related_habit: Option<Uuid>,
    pub periodicity: u32,
    pub reward: Option<String>,
    pub duration: u32,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    pub fn has_reward(&self) -> bool {
        self.reward.as_deref().is_some_and(|r| !r.is_empty())
    }
}

/// Links a user to a messaging-platform destination. One binding per user,
/// and a chat id binds to at most one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationBinding {
    pub user_id: Uuid,
    pub chat_id: String,
    pub handle: Option<String>,
    pub created_at: DateTime<Utc>,
}
