use crate::Database;
use crate::models::{BindingRow, HabitRow, format_timestamp};
use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use ritual_types::models::{Habit, NotificationBinding};

/// Outcome of a binding upsert; a chat id binds to at most one user.
pub enum BindingUpsert {
    Linked(NotificationBinding),
    ChatTaken,
}

impl Database {
    // -- Habits --

    pub fn insert_habit(&self, habit: &Habit) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO habits (id, owner_id, place, time, action, is_pleasant,
                                     related_habit, periodicity, reward, duration,
                                     is_public, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    habit.id.to_string(),
                    habit.owner_id.to_string(),
                    habit.place,
                    habit.time.to_string(),
                    habit.action,
                    habit.is_pleasant,
                    habit.related_habit.map(|id| id.to_string()),
                    habit.periodicity,
                    habit.reward,
                    habit.duration,
                    habit.is_public,
                    format_timestamp(habit.created_at),
                    format_timestamp(habit.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Full-row update, scoped to the owner. Returns false when no matching
    /// habit exists.
    pub fn update_habit(&self, habit: &Habit) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE habits
                 SET place = ?3, time = ?4, action = ?5, is_pleasant = ?6,
                     related_habit = ?7, periodicity = ?8, reward = ?9,
                     duration = ?10, is_public = ?11, updated_at = ?12
                 WHERE id = ?1 AND owner_id = ?2",
                rusqlite::params![
                    habit.id.to_string(),
                    habit.owner_id.to_string(),
                    habit.place,
                    habit.time.to_string(),
                    habit.action,
                    habit.is_pleasant,
                    habit.related_habit.map(|id| id.to_string()),
                    habit.periodicity,
                    habit.reward,
                    habit.duration,
                    habit.is_public,
                    format_timestamp(habit.updated_at),
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_habit(&self, id: Uuid) -> Result<Option<Habit>> {
        self.with_conn(|conn| {
            let row = query_habits(conn, "WHERE id = ?1", rusqlite::params![id.to_string()])?
                .pop();
            row.map(HabitRow::into_habit).transpose()
        })
    }

    /// Owner-scoped delete. The `ON DELETE SET NULL` foreign key nulls any
    /// inbound `related_habit` references. Returns false when nothing matched.
    pub fn delete_habit(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM habits WHERE id = ?1 AND owner_id = ?2",
                rusqlite::params![id.to_string(), owner_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Owner's habits, newest first. A `None` filter means "don't care".
    pub fn habits_for_owner(
        &self,
        owner_id: Uuid,
        is_pleasant: Option<bool>,
        is_public: Option<bool>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Habit>> {
        self.with_conn(|conn| {
            let rows = query_habits(
                conn,
                "WHERE owner_id = ?1
                   AND (?2 IS NULL OR is_pleasant = ?2)
                   AND (?3 IS NULL OR is_public = ?3)
                 ORDER BY created_at DESC LIMIT ?4 OFFSET ?5",
                rusqlite::params![owner_id.to_string(), is_pleasant, is_public, limit, offset],
            )?;
            rows.into_iter().map(HabitRow::into_habit).collect()
        })
    }

    pub fn public_habits(
        &self,
        is_pleasant: Option<bool>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Habit>> {
        self.with_conn(|conn| {
            let rows = query_habits(
                conn,
                "WHERE is_public = 1
                   AND (?1 IS NULL OR is_pleasant = ?1)
                 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                rusqlite::params![is_pleasant, limit, offset],
            )?;
            rows.into_iter().map(HabitRow::into_habit).collect()
        })
    }

    /// All habits due at exactly (hour, minute) — the dispatcher's scan.
    pub fn habits_due_at(&self, hour: u32, minute: u32) -> Result<Vec<Habit>> {
        let time = format!("{hour:02}:{minute:02}");
        self.with_conn(|conn| {
            let rows = query_habits(conn, "WHERE time = ?1", rusqlite::params![time])?;
            rows.into_iter().map(HabitRow::into_habit).collect()
        })
    }

    // -- Bindings --

    pub fn binding_for_user(&self, user_id: Uuid) -> Result<Option<NotificationBinding>> {
        self.with_conn(|conn| {
            let row = query_binding(conn, user_id)?;
            row.map(BindingRow::into_binding).transpose()
        })
    }

    pub fn upsert_binding(
        &self,
        user_id: Uuid,
        chat_id: &str,
        handle: Option<&str>,
    ) -> Result<BindingUpsert> {
        self.with_conn(|conn| {
            // Refuse to steal a chat id already linked to a different user.
            let holder: Option<String> = conn
                .query_row(
                    "SELECT user_id FROM bindings WHERE chat_id = ?1",
                    [chat_id],
                    |row| row.get(0),
                )
                .optional()?;

            if holder.is_some_and(|h| h != user_id.to_string()) {
                return Ok(BindingUpsert::ChatTaken);
            }

            conn.execute(
                "INSERT INTO bindings (user_id, chat_id, handle, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE
                 SET chat_id = excluded.chat_id, handle = excluded.handle",
                rusqlite::params![
                    user_id.to_string(),
                    chat_id,
                    handle,
                    format_timestamp(crate::models::now()),
                ],
            )?;

            let row = query_binding(conn, user_id)?
                .ok_or_else(|| anyhow::anyhow!("binding vanished after upsert"))?;
            Ok(BindingUpsert::Linked(row.into_binding()?))
        })
    }
}

fn query_habits(
    conn: &Connection,
    clause: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<HabitRow>> {
    let sql = format!(
        "SELECT id, owner_id, place, time, action, is_pleasant, related_habit,
                periodicity, reward, duration, is_public, created_at, updated_at
         FROM habits {clause}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok(HabitRow {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                place: row.get(2)?,
                time: row.get(3)?,
                action: row.get(4)?,
                is_pleasant: row.get(5)?,
                related_habit: row.get(6)?,
                periodicity: row.get(7)?,
                reward: row.get(8)?,
                duration: row.get(9)?,
                is_public: row.get(10)?,
                created_at: row.get(11)?,
                updated_at: row.get(12)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_binding(conn: &Connection, user_id: Uuid) -> Result<Option<BindingRow>> {
    let mut stmt = conn
        .prepare("SELECT user_id, chat_id, handle, created_at FROM bindings WHERE user_id = ?1")?;

    let row = stmt
        .query_row([user_id.to_string()], |row| {
            Ok(BindingRow {
                user_id: row.get(0)?,
                chat_id: row.get(1)?,
                handle: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
