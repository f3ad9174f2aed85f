//! The focus/break cycle state machine.
//!
//! ## State transitions
//!
//! ```text
//! Idle -> Focusing -> (ShortBreak | LongBreak) -> Focusing -> ...
//!   ^                                                  |
//!   +------------------- reset() ---------------------+
//! ```
//!
//! `is_running` is orthogonal to the phase: pausing freezes the countdown
//! exactly where it is (unlike the eye reminder, which forgets its
//! progress), and `start()` from any non-Idle phase picks it back up from
//! the same second. Phase completions chain automatically; only `reset()`
//! returns to Idle.
//!
//! Remaining time is kept in seconds internally. Observers get a
//! ceiling-minutes value published only when it changes, so a menu or
//! status line updates at most once a minute.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use super::primitives::CountdownTicker;
use crate::coordinator::Input;
use crate::error::ConfigError;
use crate::events::Event;
use crate::notify::{self, NotificationSink};
use crate::storage::{prefs, PrefStore, SessionStore};

/// Cycle phase. `Idle` is both the initial and the reset state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Focusing,
    ShortBreak,
    LongBreak,
}

impl Phase {
    /// Break phases gate the eye reminder while they are active.
    pub fn is_break(self) -> bool {
        matches!(self, Phase::ShortBreak | Phase::LongBreak)
    }
}

/// Phase durations and the long-break cadence. Changes apply at the next
/// phase transition, never to a phase already underway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub cycles_before_long_break: u32,
}

impl CycleConfig {
    pub fn from_prefs(prefs: &crate::storage::Preferences) -> Self {
        Self {
            focus_minutes: prefs.focus_minutes,
            short_break_minutes: prefs.short_break_minutes,
            long_break_minutes: prefs.long_break_minutes,
            cycles_before_long_break: prefs.cycles_before_long_break,
        }
    }
}

pub struct CycleEngine {
    phase: Phase,
    running: bool,
    seconds_remaining: u32,
    /// Last published ceiling-minutes value.
    minutes_remaining: u32,
    completed_count: u32,
    config: CycleConfig,
    ticker: Option<CountdownTicker>,
    /// Bumped on every ticker start and stop; stale deliveries are
    /// dropped.
    epoch: u64,
    inbox: UnboundedSender<Input>,
    prefs: Arc<PrefStore>,
    sink: Arc<dyn NotificationSink>,
    sessions: Arc<dyn SessionStore>,
}

impl CycleEngine {
    pub fn new(
        prefs: Arc<PrefStore>,
        sink: Arc<dyn NotificationSink>,
        sessions: Arc<dyn SessionStore>,
        inbox: UnboundedSender<Input>,
    ) -> Self {
        let config = CycleConfig::from_prefs(&prefs.snapshot());
        Self {
            phase: Phase::Idle,
            running: false,
            seconds_remaining: 0,
            minutes_remaining: 0,
            completed_count: 0,
            config,
            ticker: None,
            epoch: 0,
            inbox,
            prefs,
            sink,
            sessions,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn minutes_remaining(&self) -> u32 {
        self.minutes_remaining
    }

    pub fn completed_count(&self) -> u32 {
        self.completed_count
    }

    pub fn config(&self) -> CycleConfig {
        self.config
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// From Idle, begin a focus phase. From a paused phase, continue the
    /// countdown at the second it froze on. No-op while already running.
    pub fn start(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.running {
            return events;
        }
        if self.phase == Phase::Idle {
            self.phase = Phase::Focusing;
            self.seconds_remaining = self.config.focus_minutes * 60;
            self.running = true;
            self.start_ticker();
            events.push(Event::PhaseChanged {
                phase: self.phase,
                seconds_remaining: self.seconds_remaining,
                at: Utc::now(),
            });
            self.publish_minutes(&mut events);
        } else {
            self.running = true;
            self.start_ticker();
            events.push(Event::CycleResumed {
                phase: self.phase,
                seconds_remaining: self.seconds_remaining,
                at: Utc::now(),
            });
        }
        events
    }

    /// Freeze the countdown, keeping the phase and the exact remaining
    /// seconds. No-op while not running.
    pub fn pause(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.running = false;
        self.stop_ticker();
        Some(Event::CyclePaused {
            phase: self.phase,
            seconds_remaining: self.seconds_remaining,
            at: Utc::now(),
        })
    }

    /// Back to Idle with the completed-focus count zeroed. Never emits a
    /// completion for a phase cut short.
    pub fn reset(&mut self) -> Vec<Event> {
        self.stop_ticker();
        self.phase = Phase::Idle;
        self.running = false;
        self.seconds_remaining = 0;
        self.completed_count = 0;
        let mut events = vec![
            Event::CycleReset { at: Utc::now() },
            Event::PhaseChanged {
                phase: Phase::Idle,
                seconds_remaining: 0,
                at: Utc::now(),
            },
        ];
        self.publish_minutes(&mut events);
        events
    }

    pub fn set_focus_minutes(&mut self, minutes: u32) -> Result<(), ConfigError> {
        prefs::check_range("focus_minutes", minutes, &prefs::FOCUS_MINUTES)?;
        self.config.focus_minutes = minutes;
        self.prefs.update(|p| p.focus_minutes = minutes);
        Ok(())
    }

    pub fn set_short_break_minutes(&mut self, minutes: u32) -> Result<(), ConfigError> {
        prefs::check_range("short_break_minutes", minutes, &prefs::SHORT_BREAK_MINUTES)?;
        self.config.short_break_minutes = minutes;
        self.prefs.update(|p| p.short_break_minutes = minutes);
        Ok(())
    }

    pub fn set_long_break_minutes(&mut self, minutes: u32) -> Result<(), ConfigError> {
        prefs::check_range("long_break_minutes", minutes, &prefs::LONG_BREAK_MINUTES)?;
        self.config.long_break_minutes = minutes;
        self.prefs.update(|p| p.long_break_minutes = minutes);
        Ok(())
    }

    pub fn set_cycles_before_long_break(&mut self, cycles: u32) -> Result<(), ConfigError> {
        prefs::check_range(
            "cycles_before_long_break",
            cycles,
            &prefs::CYCLES_BEFORE_LONG_BREAK,
        )?;
        self.config.cycles_before_long_break = cycles;
        self.prefs.update(|p| p.cycles_before_long_break = cycles);
        Ok(())
    }

    /// Deliver one countdown tick. Stale epochs are dropped.
    pub(crate) fn on_tick(&mut self, epoch: u64, seconds_remaining: u32) -> Vec<Event> {
        let mut events = Vec::new();
        if epoch != self.epoch || self.ticker.is_none() {
            tracing::debug!(epoch, current = self.epoch, "stale cycle tick dropped");
            return events;
        }
        self.seconds_remaining = seconds_remaining;
        self.publish_minutes(&mut events);
        if seconds_remaining == 0 {
            self.phase_complete(&mut events);
        }
        events
    }

    // ── Phase transitions ────────────────────────────────────────────

    fn phase_complete(&mut self, events: &mut Vec<Event>) {
        self.stop_ticker();
        match self.phase {
            Phase::Focusing => {
                self.completed_count += 1;
                notify::send_focus_complete(self.sink.as_ref());
                self.sessions
                    .append(Utc::now(), u64::from(self.config.focus_minutes));
                events.push(Event::FocusCompleted {
                    completed_count: self.completed_count,
                    duration_minutes: self.config.focus_minutes,
                    at: Utc::now(),
                });

                let next = break_after(self.completed_count, self.config.cycles_before_long_break);
                self.phase = next;
                self.seconds_remaining = match next {
                    Phase::LongBreak => self.config.long_break_minutes * 60,
                    _ => self.config.short_break_minutes * 60,
                };
            }
            Phase::ShortBreak | Phase::LongBreak => {
                notify::send_break_complete(self.sink.as_ref());
                events.push(Event::BreakCompleted {
                    phase: self.phase,
                    at: Utc::now(),
                });
                self.phase = Phase::Focusing;
                self.seconds_remaining = self.config.focus_minutes * 60;
            }
            // A tick cannot arrive while idle; epoch filtering saw to it.
            Phase::Idle => return,
        }
        self.running = true;
        self.start_ticker();
        events.push(Event::PhaseChanged {
            phase: self.phase,
            seconds_remaining: self.seconds_remaining,
            at: Utc::now(),
        });
        self.publish_minutes(events);
    }

    /// Publish the ceiling-minutes value when it changed.
    fn publish_minutes(&mut self, events: &mut Vec<Event>) {
        let minutes = ceil_minutes(self.seconds_remaining);
        if minutes != self.minutes_remaining {
            self.minutes_remaining = minutes;
            events.push(Event::MinutesRemaining {
                minutes,
                at: Utc::now(),
            });
        }
    }

    fn start_ticker(&mut self) {
        self.epoch += 1;
        let epoch = self.epoch;
        let inbox = self.inbox.clone();
        self.ticker = Some(CountdownTicker::spawn(
            self.seconds_remaining,
            move |seconds_remaining| {
                let _ = inbox.send(Input::CycleTick {
                    epoch,
                    seconds_remaining,
                });
            },
        ));
    }

    fn stop_ticker(&mut self) {
        self.epoch += 1;
        self.ticker = None;
    }
}

/// Break selection after a completed focus phase.
fn break_after(completed_count: u32, cycles_before_long_break: u32) -> Phase {
    // The write boundary enforces >= 2; never let the modulo see zero.
    let cycles = cycles_before_long_break.max(1);
    if completed_count % cycles == 0 {
        Phase::LongBreak
    } else {
        Phase::ShortBreak
    }
}

/// Ceiling minutes: 0 only at zero seconds, otherwise at least 1.
fn ceil_minutes(seconds: u32) -> u32 {
    if seconds == 0 {
        0
    } else {
        seconds.div_ceil(60)
    }
}
