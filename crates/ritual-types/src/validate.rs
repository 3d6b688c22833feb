//! Cross-field habit invariants. Every write path runs the same rule set;
//! violations are accumulated per field and all returned together.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::api::HabitRequest;
use crate::models::Habit;

pub const DURATION_MIN: u32 = 1;
pub const DURATION_MAX: u32 = 120;
pub const PERIODICITY_MIN: u32 = 1;
pub const PERIODICITY_MAX: u32 = 7;

/// Field-keyed violation accumulator. Empty means valid.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Violations(BTreeMap<String, Vec<String>>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

/// Validate a candidate habit against the full rule set.
///
/// `related` is the already-resolved snapshot of the referenced habit, if
/// the candidate references one. Callers that fail to resolve the reference
/// report that as their own `related_habit` violation; here an unresolved
/// reference simply cannot trip the pleasantness rule.
pub fn validate(candidate: &HabitRequest, related: Option<&Habit>) -> Violations {
    let mut violations = Violations::new();

    let has_related = candidate.related_habit.is_some();
    let has_reward = candidate.has_reward();

    if has_related && has_reward {
        let msg = "cannot set both a related habit and a reward";
        violations.push("reward", msg);
        violations.push("related_habit", msg);
    }

    if has_related {
        if let Some(related) = related {
            if !related.is_pleasant {
                violations.push("related_habit", "related habit must be a pleasant habit");
            }
        }
    }

    if candidate.is_pleasant {
        if has_reward {
            violations.push("reward", "a pleasant habit cannot have a reward");
        }
        if has_related {
            violations.push("related_habit", "a pleasant habit cannot have a related habit");
        }
    }

    if !(DURATION_MIN..=DURATION_MAX).contains(&candidate.duration) {
        violations.push(
            "duration",
            format!("duration must be between {DURATION_MIN} and {DURATION_MAX} seconds"),
        );
    }

    if !(PERIODICITY_MIN..=PERIODICITY_MAX).contains(&candidate.periodicity) {
        violations.push(
            "periodicity",
            format!("periodicity must be between {PERIODICITY_MIN} and {PERIODICITY_MAX} days"),
        );
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn request() -> HabitRequest {
        serde_json::from_value(serde_json::json!({
            "place": "Park",
            "time": "09:00",
            "action": "run",
            "duration": 60,
        }))
        .unwrap()
    }

    fn snapshot(is_pleasant: bool) -> Habit {
        let now = Utc::now();
        Habit {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            place: "Home".into(),
            time: "21:00".parse().unwrap(),
            action: "read".into(),
            is_pleasant,
            related_habit: None,
            periodicity: 1,
            reward: None,
            duration: 30,
            is_public: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn plain_habit_is_valid() {
        assert!(validate(&request(), None).is_empty());
    }

    #[test]
    fn reward_and_related_together_rejected() {
        let mut req = request();
        req.reward = Some("coffee".into());
        req.related_habit = Some(Uuid::new_v4());

        let v = validate(&req, Some(&snapshot(true)));
        assert!(v.field("reward").is_some());
        assert!(v.field("related_habit").is_some());
    }

    #[test]
    fn reward_and_related_rejected_regardless_of_pleasantness() {
        let mut req = request();
        req.is_pleasant = true;
        req.reward = Some("coffee".into());
        req.related_habit = Some(Uuid::new_v4());

        let v = validate(&req, Some(&snapshot(true)));
        assert!(v.field("reward").is_some());
        assert!(v.field("related_habit").is_some());
    }

    #[test]
    fn related_habit_must_be_pleasant() {
        let mut req = request();
        req.related_habit = Some(Uuid::new_v4());

        assert!(validate(&req, Some(&snapshot(true))).is_empty());

        let v = validate(&req, Some(&snapshot(false)));
        assert_eq!(
            v.field("related_habit"),
            Some(&["related habit must be a pleasant habit".to_string()][..])
        );
    }

    #[test]
    fn pleasant_habit_cannot_have_reward_or_related() {
        let mut req = request();
        req.is_pleasant = true;
        req.reward = Some("cake".into());
        let v = validate(&req, None);
        assert!(v.field("reward").is_some());

        let mut req = request();
        req.is_pleasant = true;
        req.related_habit = Some(Uuid::new_v4());
        let v = validate(&req, Some(&snapshot(true)));
        assert!(v.field("related_habit").is_some());
    }

    #[test]
    fn empty_reward_counts_as_absent() {
        let mut req = request();
        req.is_pleasant = true;
        req.reward = Some(String::new());
        assert!(validate(&req, None).is_empty());
    }

    #[test]
    fn all_violations_reported_in_one_pass() {
        let mut req = request();
        req.is_pleasant = true;
        req.reward = Some("coffee".into());
        req.related_habit = Some(Uuid::new_v4());
        req.duration = 0;
        req.periodicity = 9;

        let v = validate(&req, Some(&snapshot(false)));
        assert!(v.field("reward").is_some());
        assert!(v.field("related_habit").is_some());
        assert!(v.field("duration").is_some());
        assert!(v.field("periodicity").is_some());
        // rule 1, rule 2, rule 3 all hit related_habit
        assert_eq!(v.field("related_habit").unwrap().len(), 3);
    }

    #[test]
    fn duration_boundaries() {
        for (duration, ok) in [(0, false), (1, true), (120, true), (121, false)] {
            let mut req = request();
            req.duration = duration;
            assert_eq!(validate(&req, None).is_empty(), ok, "duration={duration}");
        }
    }

    #[test]
    fn periodicity_boundaries() {
        for (periodicity, ok) in [(0, false), (1, true), (7, true), (8, false)] {
            let mut req = request();
            req.periodicity = periodicity;
            assert_eq!(validate(&req, None).is_empty(), ok, "periodicity={periodicity}");
        }
    }

    #[test]
    fn violations_serialize_field_keyed() {
        let mut v = Violations::new();
        v.push("reward", "a pleasant habit cannot have a reward");

        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"reward": ["a pleasant habit cannot have a reward"]})
        );
    }
}
