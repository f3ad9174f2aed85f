//! Gate-source aggregation for the reminder pause/resume decision.
//!
//! Four independent inputs can each force the eye reminder inactive:
//! the cycle being in a break phase, the display sleeping, the screen
//! being locked, and (behind a preference) the foreground app running
//! fullscreen. Inputs are stored as explicit booleans and the effective
//! gate is recomputed from all of them on every read, never tracked
//! incrementally.

use serde::{Deserialize, Serialize};

/// A source that, while active, holds the eye reminder paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateSource {
    CycleBreak,
    DisplayAsleep,
    ScreenLocked,
    AppFullscreen,
}

/// Independent gate inputs plus the derived suspend decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateFlags {
    paused_by_cycle: bool,
    display_asleep: bool,
    screen_locked: bool,
    app_fullscreen: bool,
    fullscreen_gate_enabled: bool,
}

impl GateFlags {
    pub fn new(fullscreen_gate_enabled: bool) -> Self {
        Self {
            fullscreen_gate_enabled,
            ..Self::default()
        }
    }

    // ── Setters ──────────────────────────────────────────────────────
    // Each returns true when the stored value changed, so the caller
    // only ever reacts to edges.

    pub fn set_paused_by_cycle(&mut self, active: bool) -> bool {
        assign(&mut self.paused_by_cycle, active)
    }

    pub fn set_display_asleep(&mut self, asleep: bool) -> bool {
        assign(&mut self.display_asleep, asleep)
    }

    pub fn set_screen_locked(&mut self, locked: bool) -> bool {
        assign(&mut self.screen_locked, locked)
    }

    /// Fullscreen readings only stick while the gate preference is on;
    /// with the preference off the flag is forced back to false.
    pub fn set_app_fullscreen(&mut self, fullscreen: bool) -> bool {
        assign(
            &mut self.app_fullscreen,
            fullscreen && self.fullscreen_gate_enabled,
        )
    }

    pub fn set_fullscreen_gate_enabled(&mut self, enabled: bool) -> bool {
        let changed = assign(&mut self.fullscreen_gate_enabled, enabled);
        if !enabled {
            self.app_fullscreen = false;
        }
        changed
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn paused_by_cycle(&self) -> bool {
        self.paused_by_cycle
    }

    pub fn display_asleep(&self) -> bool {
        self.display_asleep
    }

    pub fn screen_locked(&self) -> bool {
        self.screen_locked
    }

    pub fn app_fullscreen(&self) -> bool {
        self.app_fullscreen
    }

    pub fn fullscreen_gate_enabled(&self) -> bool {
        self.fullscreen_gate_enabled
    }

    /// The effective gate: true while any blocking source is active.
    pub fn blocked(&self) -> bool {
        self.paused_by_cycle
            || self.display_asleep
            || self.screen_locked
            || (self.fullscreen_gate_enabled && self.app_fullscreen)
    }

    /// Every source currently holding the gate closed, for display and
    /// event provenance.
    pub fn blocking_sources(&self) -> Vec<GateSource> {
        let mut sources = Vec::new();
        if self.paused_by_cycle {
            sources.push(GateSource::CycleBreak);
        }
        if self.display_asleep {
            sources.push(GateSource::DisplayAsleep);
        }
        if self.screen_locked {
            sources.push(GateSource::ScreenLocked);
        }
        if self.fullscreen_gate_enabled && self.app_fullscreen {
            sources.push(GateSource::AppFullscreen);
        }
        sources
    }
}

fn assign(slot: &mut bool, value: bool) -> bool {
    let changed = *slot != value;
    *slot = value;
    changed
}
