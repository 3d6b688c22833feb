use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::TimeOfDay;

// -- JWT Claims --

/// JWT claims shared between the REST middleware and anything else that
/// authenticates a bearer token. Canonical definition lives here in
/// ritual-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Habits --

/// Candidate field set for creating or fully updating a habit. The owner
/// comes from the authenticated caller, never from the payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HabitRequest {
    pub place: String,
    pub time: TimeOfDay,
    pub action: String,
    #[serde(default)]
    pub is_pleasant: bool,
    #[serde(default)]
    pub related_habit: Option<Uuid>,
    #[serde(default = "default_periodicity")]
    pub periodicity: u32,
    #[serde(default)]
    pub reward: Option<String>,
    pub duration: u32,
    #[serde(default)]
    pub is_public: bool,
}

fn default_periodicity() -> u32 {
    1
}

impl HabitRequest {
    /// Collapse an empty or whitespace-only reward to `None` so "has a
    /// reward" means the same thing on every path.
    pub fn normalize(mut self) -> Self {
        if self.reward.as_deref().is_some_and(|r| r.trim().is_empty()) {
            self.reward = None;
        }
        self
    }

    pub fn has_reward(&self) -> bool {
        self.reward.as_deref().is_some_and(|r| !r.is_empty())
    }
}

// -- Bindings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingRequest {
    pub user_id: Uuid,
    pub chat_id: String,
    #[serde(default)]
    pub handle: Option<String>,
}
