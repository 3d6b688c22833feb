//! Database row types — these map directly to SQLite rows.
//!
//! Kept as raw strings so the query layer never fails inside a row-mapping
//! closure; conversion into ritual-types models happens afterwards with
//! proper error context.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Timelike, Utc};

use ritual_types::models::{Habit, NotificationBinding};

pub struct HabitRow {
    pub id: String,
    pub owner_id: String,
    pub place: String,
    pub time: String,
    pub action: String,
    pub is_pleasant: bool,
    pub related_habit: Option<String>,
    pub periodicity: u32,
    pub reward: Option<String>,
    pub duration: u32,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct BindingRow {
    pub user_id: String,
    pub chat_id: String,
    pub handle: Option<String>,
    pub created_at: String,
}

impl HabitRow {
    pub fn into_habit(self) -> Result<Habit> {
        Ok(Habit {
            id: self.id.parse().context("habit id")?,
            owner_id: self.owner_id.parse().context("habit owner_id")?,
            place: self.place,
            time: self.time.parse().context("habit time")?,
            action: self.action,
            is_pleasant: self.is_pleasant,
            related_habit: self
                .related_habit
                .map(|id| id.parse().context("habit related_habit"))
                .transpose()?,
            periodicity: self.periodicity,
            reward: self.reward.filter(|r| !r.is_empty()),
            duration: self.duration,
            is_public: self.is_public,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

impl BindingRow {
    pub fn into_binding(self) -> Result<NotificationBinding> {
        Ok(NotificationBinding {
            user_id: self.user_id.parse().context("binding user_id")?,
            chat_id: self.chat_id,
            handle: self.handle,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Current time truncated to the microsecond precision the store keeps, so
/// a persisted timestamp reads back equal to the one handed in.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.timestamp_subsec_micros() * 1000)
        .unwrap_or(now)
}

/// Fixed-width RFC 3339 so `ORDER BY created_at` stays a plain text sort.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| format!("timestamp '{s}'"))?;
    Ok(dt.with_timezone(&Utc))
}
