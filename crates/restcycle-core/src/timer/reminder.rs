//! The recurring eye-rest reminder.
//!
//! A repeating interval timer that posts a "look away" notification every
//! N minutes. Pausing cancels the timer outright and resuming always
//! starts a fresh full interval; partial progress is deliberately never
//! credited, on the theory that an interruption long enough to gate the
//! reminder also rested the eyes. This is the opposite of
//! [`CycleEngine`](super::CycleEngine), whose pause keeps the exact
//! remaining time.
//!
//! `enabled` records the user's wish and survives pauses; only the
//! coordinator's gating decides whether an enabled reminder is actually
//! running.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;

use super::primitives::IntervalTimer;
use crate::coordinator::Input;
use crate::error::ConfigError;
use crate::events::Event;
use crate::notify::{self, NotificationSink};
use crate::storage::{prefs, PrefStore};

pub struct ReminderEngine {
    enabled: bool,
    interval_minutes: u32,
    next_fire_at: Option<DateTime<Utc>>,
    timer: Option<IntervalTimer>,
    /// Bumped on every timer start and cancel; deliveries carrying an
    /// older epoch are stale and get dropped.
    epoch: u64,
    inbox: UnboundedSender<Input>,
    prefs: Arc<PrefStore>,
    sink: Arc<dyn NotificationSink>,
}

impl ReminderEngine {
    /// Restore from persisted preferences. No timer is started here; the
    /// coordinator resumes an enabled reminder once gating is known.
    pub fn new(
        prefs: Arc<PrefStore>,
        sink: Arc<dyn NotificationSink>,
        inbox: UnboundedSender<Input>,
    ) -> Self {
        let saved = prefs.snapshot();
        Self {
            enabled: saved.reminder_enabled,
            interval_minutes: saved.reminder_interval_minutes,
            next_fire_at: None,
            timer: None,
            epoch: 0,
            inbox,
            prefs,
            sink,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn next_fire_at(&self) -> Option<DateTime<Utc>> {
        self.next_fire_at
    }

    /// A live interval timer exists (enabled and not gated).
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Turn the reminder on and start a full interval. The coordinator
    /// pauses it right back if a gate is currently active.
    pub fn enable(&mut self) -> Event {
        self.enabled = true;
        self.prefs.update(|p| p.reminder_enabled = true);
        let next_fire_at = self.start_timer();
        Event::ReminderEnabled {
            interval_minutes: self.interval_minutes,
            next_fire_at,
            at: Utc::now(),
        }
    }

    pub fn disable(&mut self) -> Event {
        self.enabled = false;
        self.prefs.update(|p| p.reminder_enabled = false);
        self.stop_timer();
        self.next_fire_at = None;
        Event::ReminderDisabled { at: Utc::now() }
    }

    pub fn toggle(&mut self) -> Event {
        if self.enabled {
            self.disable()
        } else {
            self.enable()
        }
    }

    /// Change the interval. A running timer restarts from scratch with
    /// the new value; a paused reminder stays paused and picks the new
    /// interval up on resume.
    pub fn set_interval(&mut self, minutes: u32) -> Result<Event, ConfigError> {
        prefs::check_range(
            "reminder_interval_minutes",
            minutes,
            &prefs::REMINDER_INTERVAL_MINUTES,
        )?;
        self.interval_minutes = minutes;
        self.prefs.update(|p| p.reminder_interval_minutes = minutes);
        if self.timer.is_some() {
            self.start_timer();
        }
        Ok(Event::ReminderIntervalChanged {
            minutes,
            at: Utc::now(),
        })
    }

    /// Cancel the timer without touching `enabled`. No-op while already
    /// paused.
    pub fn pause(&mut self) -> Option<Event> {
        if self.timer.is_none() {
            return None;
        }
        self.stop_timer();
        self.next_fire_at = None;
        Some(Event::ReminderPaused { at: Utc::now() })
    }

    /// Start a fresh full interval. No-op while disabled.
    pub fn resume(&mut self) -> Option<Event> {
        if !self.enabled {
            return None;
        }
        let next_fire_at = self.start_timer();
        Some(Event::ReminderResumed {
            next_fire_at,
            at: Utc::now(),
        })
    }

    /// Fire immediately and, when enabled, restart the interval as though
    /// it had fired naturally.
    pub fn trigger_now(&mut self) -> Event {
        notify::send_eye_reminder(self.sink.as_ref());
        if self.enabled {
            self.start_timer();
        }
        Event::ReminderFired {
            next_fire_at: self.next_fire_at,
            at: Utc::now(),
        }
    }

    /// Deliver an interval-timer fire. Stale epochs are dropped.
    pub(crate) fn on_elapsed(&mut self, epoch: u64) -> Option<Event> {
        if epoch != self.epoch || self.timer.is_none() {
            tracing::debug!(epoch, current = self.epoch, "stale reminder fire dropped");
            return None;
        }
        notify::send_eye_reminder(self.sink.as_ref());
        let next = Utc::now() + chrono::Duration::minutes(i64::from(self.interval_minutes));
        self.next_fire_at = Some(next);
        Some(Event::ReminderFired {
            next_fire_at: Some(next),
            at: Utc::now(),
        })
    }

    fn start_timer(&mut self) -> DateTime<Utc> {
        self.epoch += 1;
        let epoch = self.epoch;
        let inbox = self.inbox.clone();
        let period = Duration::from_secs(u64::from(self.interval_minutes) * 60);
        self.timer = Some(IntervalTimer::spawn(period, move || {
            let _ = inbox.send(Input::ReminderElapsed { epoch });
        }));
        let next = Utc::now() + chrono::Duration::minutes(i64::from(self.interval_minutes));
        self.next_fire_at = Some(next);
        next
    }

    fn stop_timer(&mut self) {
        self.epoch += 1;
        self.timer = None;
    }
}
