//! Reminder dispatch: scan habits due at the current wall-clock minute and
//! push reminders through the gateway. Failures are per-habit, logged and
//! counted, never fatal to the tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Timelike;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use ritual_db::Database;
use ritual_types::models::Habit;

use crate::gateway::MessagingGateway;

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    db: Arc<Database>,
    gateway: Arc<dyn MessagingGateway>,

    /// Non-reentrancy guard: a tick that finds this held is skipped.
    running: Mutex<()>,
}

/// Counters for one tick, handed back to the caller rather than kept as
/// ambient state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub sent: usize,
    pub missing_binding: usize,
    pub failed: usize,
}

impl Dispatcher {
    pub fn new(db: Arc<Database>, gateway: Arc<dyn MessagingGateway>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                db,
                gateway,
                running: Mutex::new(()),
            }),
        }
    }

    /// The scheduler's entry point: reads the wall clock and dispatches
    /// everything due this minute. Skips entirely if a previous tick is
    /// still in flight.
    pub async fn tick(&self) -> TickReport {
        let Ok(_guard) = self.inner.running.try_lock() else {
            warn!("previous tick still running, skipping this one");
            return TickReport::default();
        };

        let now = chrono::Utc::now();
        self.run_at(now.hour(), now.minute()).await
    }

    /// Dispatch for an explicit (hour, minute). Matching is exact on both.
    pub async fn run_at(&self, hour: u32, minute: u32) -> TickReport {
        let mut report = TickReport::default();

        let due = match self.inner.db.habits_due_at(hour, minute) {
            Ok(due) => due,
            Err(e) => {
                error!("due-habit scan failed at {hour:02}:{minute:02}: {e:#}");
                return report;
            }
        };
        report.due = due.len();

        for habit in due {
            self.dispatch_one(&habit, &mut report).await;
        }

        report
    }

    async fn dispatch_one(&self, habit: &Habit, report: &mut TickReport) {
        let binding = match self.inner.db.binding_for_user(habit.owner_id) {
            Ok(binding) => binding,
            Err(e) => {
                error!(habit = %habit.id, "binding lookup failed: {e:#}");
                report.failed += 1;
                return;
            }
        };

        let Some(binding) = binding else {
            info!(habit = %habit.id, owner = %habit.owner_id, "owner has no linked destination");
            report.missing_binding += 1;
            return;
        };

        // Only fetch the linked habit when its action will actually appear
        // in the message.
        let related = match habit.related_habit {
            Some(related_id) if !habit.has_reward() => {
                match self.inner.db.get_habit(related_id) {
                    Ok(related) => related,
                    Err(e) => {
                        warn!(habit = %habit.id, "related habit lookup failed: {e:#}");
                        None
                    }
                }
            }
            _ => None,
        };

        let text = render_reminder(habit, related.as_ref());

        match self.inner.gateway.send(&binding.chat_id, &text).await {
            Ok(()) => {
                debug!(habit = %habit.id, chat = %binding.chat_id, "reminder sent");
                report.sent += 1;
            }
            Err(e) => {
                error!(habit = %habit.id, "reminder send failed: {e:#}");
                report.failed += 1;
            }
        }
    }
}

/// Render the reminder text for a habit. `related` is the resolved linked
/// habit, used only when no reward is set.
pub fn render_reminder(habit: &Habit, related: Option<&Habit>) -> String {
    let mut text = format!(
        "Habit reminder!\n\n\
         I will {} at {} at {}.\n\
         Time budgeted: {} seconds.\n\
         Recurs every: {} days.",
        habit.action, habit.time, habit.place, habit.duration, habit.periodicity
    );

    if let Some(reward) = habit.reward.as_deref().filter(|r| !r.is_empty()) {
        text.push_str(&format!("\nReward: {reward}"));
    } else if let Some(related) = related {
        text.push_str(&format!("\nLinked habit: {}", related.action));
    }

    text
}

/// Drive the dispatcher on a fixed cadence until the task is dropped.
///
/// The default one-minute tick guarantees every wall-clock minute is
/// observed exactly once, so exact-minute matching never silently skips a
/// habit. Missed ticks (e.g. after suspend) are skipped, not replayed.
pub async fn run_scheduler(dispatcher: Dispatcher, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("reminder scheduler running, tick every {:?}", tick);

    loop {
        interval.tick().await;
        let report = dispatcher.tick().await;
        if report.due > 0 {
            info!(
                due = report.due,
                sent = report.sent,
                missing_binding = report.missing_binding,
                failed = report.failed,
                "reminder tick complete"
            );
        }
    }
}
