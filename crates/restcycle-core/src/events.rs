use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::GateSource;
use crate::timer::Phase;

/// Every state change in the engines produces an Event.
/// The coordinator forwards them to whoever is listening (the REPL
/// printer, a future GUI layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ReminderEnabled {
        interval_minutes: u32,
        next_fire_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    ReminderDisabled {
        at: DateTime<Utc>,
    },
    ReminderIntervalChanged {
        minutes: u32,
        at: DateTime<Utc>,
    },
    /// The reminder timer was cancelled by a gate; `enabled` is untouched.
    ReminderPaused {
        at: DateTime<Utc>,
    },
    /// A fresh full interval was started; time spent paused is not credited.
    ReminderResumed {
        next_fire_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// A rest notification went out. `next_fire_at` is None when the fire
    /// was triggered manually while the reminder is disabled.
    ReminderFired {
        next_fire_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        phase: Phase,
        seconds_remaining: u32,
        at: DateTime<Utc>,
    },
    CyclePaused {
        phase: Phase,
        seconds_remaining: u32,
        at: DateTime<Utc>,
    },
    CycleResumed {
        phase: Phase,
        seconds_remaining: u32,
        at: DateTime<Utc>,
    },
    /// Everything zeroed, including the completed-focus count.
    CycleReset {
        at: DateTime<Utc>,
    },
    FocusCompleted {
        completed_count: u32,
        duration_minutes: u32,
        at: DateTime<Utc>,
    },
    /// `phase` is the break that just ended.
    BreakCompleted {
        phase: Phase,
        at: DateTime<Utc>,
    },
    /// Published only when the ceiling-minute value actually changes.
    MinutesRemaining {
        minutes: u32,
        at: DateTime<Utc>,
    },
    /// The effective gate crossed an edge; `sources` names every input
    /// currently holding it closed.
    GateChanged {
        blocked: bool,
        sources: Vec<GateSource>,
        at: DateTime<Utc>,
    },
    Snapshot {
        reminder_enabled: bool,
        reminder_running: bool,
        reminder_interval_minutes: u32,
        next_fire_at: Option<DateTime<Utc>>,
        phase: Phase,
        cycle_running: bool,
        seconds_remaining: u32,
        minutes_remaining: u32,
        completed_count: u32,
        gate_blocked: bool,
        gate_sources: Vec<GateSource>,
        at: DateTime<Utc>,
    },
}
