//! Wires the engines, gate flags, and environment signals together.
//!
//! Every input -- user command, environment event, timer delivery --
//! arrives through one inbox and is handled to completion on one task,
//! so engine state only ever changes from a single serialized context.
//! Timer deliveries carry the epoch of the spawn that produced them,
//! which lets [`Coordinator::handle`] discard anything sent by a timer
//! that was cancelled while the message was in flight.
//!
//! Gating policy: a source becoming active pauses the eye reminder
//! unconditionally; a source becoming inactive resumes it only when every
//! other source reads clear. Both directions are edge-driven and
//! idempotent.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::events::Event;
use crate::gate::GateFlags;
use crate::notify::NotificationSink;
use crate::probe::EnvironmentProbe;
use crate::storage::{PrefStore, SessionStore};
use crate::timer::{CycleEngine, Phase, ReminderEngine};

/// User-initiated operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ReminderEnable,
    ReminderDisable,
    ReminderToggle,
    ReminderTriggerNow,
    ReminderSetInterval(u32),
    CycleStart,
    CyclePause,
    CycleReset,
    SetFocusMinutes(u32),
    SetShortBreakMinutes(u32),
    SetLongBreakMinutes(u32),
    SetCyclesBeforeLongBreak(u32),
    SetFullscreenGate(bool),
    Status,
    Shutdown,
}

/// Environment happenings delivered by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvEvent {
    DisplaySlept,
    DisplayWoke,
    ScreenLocked,
    ScreenUnlocked,
    /// Foreground application changed; re-sample the fullscreen probe.
    AppActivated,
    /// Workspace changed; re-sample the fullscreen probe.
    WorkspaceChanged,
}

/// Everything that can arrive in the coordinator's inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Env(EnvEvent),
    /// The reminder interval elapsed, tagged with its spawning epoch.
    ReminderElapsed { epoch: u64 },
    /// The cycle countdown advanced, tagged with its spawning epoch.
    CycleTick { epoch: u64, seconds_remaining: u32 },
}

pub struct Coordinator {
    reminder: ReminderEngine,
    cycle: CycleEngine,
    gates: GateFlags,
    probe: Arc<dyn EnvironmentProbe>,
    prefs: Arc<PrefStore>,
    last_blocked: bool,
    shutdown: bool,
}

impl Coordinator {
    /// Build both engines from persisted preferences. `inbox` must be the
    /// sender half of the receiver later passed to [`run`], so that timer
    /// deliveries land in the same serialized queue as everything else.
    pub fn new(
        prefs: Arc<PrefStore>,
        sink: Arc<dyn NotificationSink>,
        sessions: Arc<dyn SessionStore>,
        probe: Arc<dyn EnvironmentProbe>,
        inbox: UnboundedSender<Input>,
    ) -> Self {
        let saved = prefs.snapshot();
        let reminder = ReminderEngine::new(prefs.clone(), sink.clone(), inbox.clone());
        let cycle = CycleEngine::new(prefs.clone(), sink, sessions, inbox);
        Self {
            reminder,
            cycle,
            gates: GateFlags::new(saved.fullscreen_gate_enabled),
            probe,
            prefs,
            last_blocked: false,
            shutdown: false,
        }
    }

    /// Start whatever the persisted preferences say should be running.
    /// Called once before the input loop.
    pub fn boot(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.reminder.is_enabled() {
            self.resume_if_fully_active(&mut events);
        }
        events
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Process one input on the serialized context.
    pub fn handle(&mut self, input: Input) -> Vec<Event> {
        let mut events = Vec::new();
        match input {
            Input::Command(command) => self.handle_command(command, &mut events),
            Input::Env(env) => self.handle_env(env, &mut events),
            Input::ReminderElapsed { epoch } => events.extend(self.reminder.on_elapsed(epoch)),
            Input::CycleTick {
                epoch,
                seconds_remaining,
            } => {
                let cycle_events = self.cycle.on_tick(epoch, seconds_remaining);
                self.dispatch_cycle(cycle_events, &mut events);
            }
        }
        events
    }

    /// Drive the coordinator until [`Command::Shutdown`] arrives or the
    /// inbox closes. Events are forwarded to `events_tx`; a vanished
    /// subscriber only stops the forwarding.
    pub async fn run(mut self, mut rx: UnboundedReceiver<Input>, events_tx: UnboundedSender<Event>) {
        for event in self.boot() {
            let _ = events_tx.send(event);
        }
        while let Some(input) = rx.recv().await {
            for event in self.handle(input) {
                let _ = events_tx.send(event);
            }
            if self.shutdown {
                tracing::info!("coordinator shutting down");
                break;
            }
        }
    }

    fn handle_command(&mut self, command: Command, events: &mut Vec<Event>) {
        match command {
            Command::ReminderEnable => {
                events.push(self.reminder.enable());
                self.repause_if_blocked(events);
            }
            Command::ReminderDisable => events.push(self.reminder.disable()),
            Command::ReminderToggle => {
                let enabling = !self.reminder.is_enabled();
                events.push(self.reminder.toggle());
                if enabling {
                    self.repause_if_blocked(events);
                }
            }
            Command::ReminderTriggerNow => {
                events.push(self.reminder.trigger_now());
                self.repause_if_blocked(events);
            }
            Command::ReminderSetInterval(minutes) => match self.reminder.set_interval(minutes) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!(error = %e, "interval change rejected"),
            },
            Command::CycleStart => {
                let cycle_events = self.cycle.start();
                self.dispatch_cycle(cycle_events, events);
            }
            Command::CyclePause => events.extend(self.cycle.pause()),
            Command::CycleReset => {
                let cycle_events = self.cycle.reset();
                self.dispatch_cycle(cycle_events, events);
            }
            Command::SetFocusMinutes(minutes) => {
                if let Err(e) = self.cycle.set_focus_minutes(minutes) {
                    tracing::warn!(error = %e, "focus duration rejected");
                }
            }
            Command::SetShortBreakMinutes(minutes) => {
                if let Err(e) = self.cycle.set_short_break_minutes(minutes) {
                    tracing::warn!(error = %e, "short break duration rejected");
                }
            }
            Command::SetLongBreakMinutes(minutes) => {
                if let Err(e) = self.cycle.set_long_break_minutes(minutes) {
                    tracing::warn!(error = %e, "long break duration rejected");
                }
            }
            Command::SetCyclesBeforeLongBreak(cycles) => {
                if let Err(e) = self.cycle.set_cycles_before_long_break(cycles) {
                    tracing::warn!(error = %e, "long break cadence rejected");
                }
            }
            Command::SetFullscreenGate(enabled) => {
                self.prefs.update(|p| p.fullscreen_gate_enabled = enabled);
                if enabled {
                    self.gates.set_fullscreen_gate_enabled(true);
                    self.refresh_fullscreen(events);
                } else {
                    let was_fullscreen = self.gates.app_fullscreen();
                    self.gates.set_fullscreen_gate_enabled(false);
                    if was_fullscreen {
                        self.resume_if_fully_active(events);
                    }
                }
                self.publish_gate(events);
            }
            Command::Status => events.push(self.snapshot()),
            Command::Shutdown => self.shutdown = true,
        }
    }

    fn handle_env(&mut self, env: EnvEvent, events: &mut Vec<Event>) {
        match env {
            EnvEvent::DisplaySlept => {
                if self.gates.set_display_asleep(true) {
                    self.pause_if_needed(events);
                }
            }
            EnvEvent::DisplayWoke => {
                if self.gates.set_display_asleep(false) {
                    self.resume_if_fully_active(events);
                }
            }
            EnvEvent::ScreenLocked => {
                if self.gates.set_screen_locked(true) {
                    self.pause_if_needed(events);
                }
            }
            EnvEvent::ScreenUnlocked => {
                if self.gates.set_screen_locked(false) {
                    self.resume_if_fully_active(events);
                }
            }
            EnvEvent::AppActivated | EnvEvent::WorkspaceChanged => self.refresh_fullscreen(events),
        }
        self.publish_gate(events);
    }

    /// Forward cycle events, reacting to phase edges as they pass.
    fn dispatch_cycle(&mut self, cycle_events: Vec<Event>, events: &mut Vec<Event>) {
        for event in cycle_events {
            let phase = match &event {
                Event::PhaseChanged { phase, .. } => Some(*phase),
                _ => None,
            };
            events.push(event);
            if let Some(phase) = phase {
                self.on_phase_changed(phase, events);
            }
        }
    }

    /// Break entry closes the cycle gate; leaving a break (including by
    /// reset) reopens it.
    fn on_phase_changed(&mut self, phase: Phase, events: &mut Vec<Event>) {
        if self.gates.set_paused_by_cycle(phase.is_break()) {
            if phase.is_break() {
                self.pause_if_needed(events);
            } else {
                self.resume_if_fully_active(events);
            }
            self.publish_gate(events);
        }
    }

    /// Pull-based fullscreen sampling. A missing capability reads as a
    /// plain false.
    fn refresh_fullscreen(&mut self, events: &mut Vec<Event>) {
        if !self.gates.fullscreen_gate_enabled() {
            if self.gates.set_app_fullscreen(false) {
                self.resume_if_fully_active(events);
            }
            return;
        }
        let active = self.probe.is_fullscreen_active();
        if self.gates.set_app_fullscreen(active) {
            if active {
                self.pause_if_needed(events);
            } else {
                self.resume_if_fully_active(events);
            }
        }
    }

    /// Gating for a reminder the user just turned on or fired manually
    /// while a gate happens to be active.
    fn repause_if_blocked(&mut self, events: &mut Vec<Event>) {
        if self.gates.blocked() {
            self.pause_if_needed(events);
        }
    }

    /// Close the reminder down while any gate holds. Idempotent.
    fn pause_if_needed(&mut self, events: &mut Vec<Event>) {
        if self.reminder.is_enabled() {
            events.extend(self.reminder.pause());
        }
    }

    /// Reopen the reminder only when every gate reads clear. Idempotent.
    fn resume_if_fully_active(&mut self, events: &mut Vec<Event>) {
        if !self.gates.blocked() && !self.reminder.is_running() {
            events.extend(self.reminder.resume());
        }
    }

    /// Emit a gate event when the effective decision crossed an edge.
    fn publish_gate(&mut self, events: &mut Vec<Event>) {
        let blocked = self.gates.blocked();
        if blocked != self.last_blocked {
            self.last_blocked = blocked;
            events.push(Event::GateChanged {
                blocked,
                sources: self.gates.blocking_sources(),
                at: Utc::now(),
            });
        }
    }

    /// Full engine state for observers (the `status` command).
    fn snapshot(&self) -> Event {
        Event::Snapshot {
            reminder_enabled: self.reminder.is_enabled(),
            reminder_running: self.reminder.is_running(),
            reminder_interval_minutes: self.reminder.interval_minutes(),
            next_fire_at: self.reminder.next_fire_at(),
            phase: self.cycle.phase(),
            cycle_running: self.cycle.is_running(),
            seconds_remaining: self.cycle.seconds_remaining(),
            minutes_remaining: self.cycle.minutes_remaining(),
            completed_count: self.cycle.completed_count(),
            gate_blocked: self.gates.blocked(),
            gate_sources: self.gates.blocking_sources(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;
    use crate::storage::MemorySessionStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::time;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<NotificationKind>>);

    impl NotificationSink for RecordingSink {
        fn send(&self, kind: NotificationKind, _title: &str, _body: &str) {
            self.0.lock().unwrap().push(kind);
        }
    }

    struct SimProbe(Arc<AtomicBool>);

    impl EnvironmentProbe for SimProbe {
        fn is_fullscreen_active(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        prefs: Arc<PrefStore>,
        fullscreen: Arc<AtomicBool>,
        coordinator: Coordinator,
        rx: UnboundedReceiver<Input>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Arc::new(PrefStore::open(dir.path().join("config.toml")));
        let fullscreen = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = Coordinator::new(
            prefs.clone(),
            Arc::new(RecordingSink::default()),
            Arc::new(MemorySessionStore::default()),
            Arc::new(SimProbe(fullscreen.clone())),
            tx,
        );
        Fixture {
            _dir: dir,
            prefs,
            fullscreen,
            coordinator,
            rx,
        }
    }

    fn cmd(f: &mut Fixture, command: Command) -> Vec<Event> {
        f.coordinator.handle(Input::Command(command))
    }

    fn env(f: &mut Fixture, event: EnvEvent) -> Vec<Event> {
        f.coordinator.handle(Input::Env(event))
    }

    /// Pump timer inputs through the coordinator until `done` is
    /// satisfied by the collected events.
    async fn drive_until(
        f: &mut Fixture,
        events: &mut Vec<Event>,
        mut done: impl FnMut(&[Event]) -> bool,
    ) {
        for _ in 0..20_000 {
            if done(events) {
                return;
            }
            let input = time::timeout(Duration::from_secs(24 * 3600), f.rx.recv())
                .await
                .expect("expected a timer input")
                .expect("inbox closed");
            events.extend(f.coordinator.handle(input));
        }
        panic!("drive_until hit the input cap");
    }

    fn count(events: &[Event], pred: impl Fn(&Event) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[tokio::test(start_paused = true)]
    async fn lock_pauses_and_unlock_resumes() {
        let mut f = fixture();
        cmd(&mut f, Command::ReminderEnable);
        assert!(f.coordinator.reminder.is_running());

        let events = env(&mut f, EnvEvent::ScreenLocked);
        assert!(!f.coordinator.reminder.is_running());
        assert!(events.iter().any(|e| matches!(e, Event::ReminderPaused { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::GateChanged { blocked: true, .. })));

        let events = env(&mut f, EnvEvent::ScreenUnlocked);
        assert!(f.coordinator.reminder.is_running());
        assert!(events.iter().any(|e| matches!(e, Event::ReminderResumed { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::GateChanged { blocked: false, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn gating_ignores_a_disabled_reminder() {
        let mut f = fixture();
        let events = env(&mut f, EnvEvent::ScreenLocked);
        assert!(!events.iter().any(|e| matches!(e, Event::ReminderPaused { .. })));
        let events = env(&mut f, EnvEvent::ScreenUnlocked);
        assert!(!events.iter().any(|e| matches!(e, Event::ReminderResumed { .. })));
        assert!(!f.coordinator.reminder.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_requires_every_source_clear() {
        let mut f = fixture();
        cmd(&mut f, Command::ReminderEnable);
        cmd(&mut f, Command::SetFullscreenGate(true));
        f.fullscreen.store(true, Ordering::SeqCst);

        env(&mut f, EnvEvent::AppActivated);
        assert!(!f.coordinator.reminder.is_running());

        env(&mut f, EnvEvent::ScreenLocked);
        env(&mut f, EnvEvent::DisplaySlept);

        // Clearing sleep and lock is not enough while fullscreen holds.
        let mut events = env(&mut f, EnvEvent::DisplayWoke);
        events.extend(env(&mut f, EnvEvent::ScreenUnlocked));
        assert!(!events.iter().any(|e| matches!(e, Event::ReminderResumed { .. })));
        assert!(!f.coordinator.reminder.is_running());

        // The last source falling resumes exactly once.
        f.fullscreen.store(false, Ordering::SeqCst);
        let events = env(&mut f, EnvEvent::AppActivated);
        assert_eq!(
            count(&events, |e| matches!(e, Event::ReminderResumed { .. })),
            1
        );
        assert!(f.coordinator.reminder.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_sources_pause_only_once() {
        let mut f = fixture();
        cmd(&mut f, Command::ReminderEnable);

        let mut events = env(&mut f, EnvEvent::ScreenLocked);
        events.extend(env(&mut f, EnvEvent::DisplaySlept));
        assert_eq!(
            count(&events, |e| matches!(e, Event::ReminderPaused { .. })),
            1
        );
        // One gate edge too: the second source joined an already closed
        // gate.
        assert_eq!(
            count(&events, |e| matches!(e, Event::GateChanged { .. })),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fullscreen_gate_disable_releases_its_hold() {
        let mut f = fixture();
        cmd(&mut f, Command::ReminderEnable);
        cmd(&mut f, Command::SetFullscreenGate(true));
        f.fullscreen.store(true, Ordering::SeqCst);
        env(&mut f, EnvEvent::AppActivated);
        assert!(!f.coordinator.reminder.is_running());

        let events = cmd(&mut f, Command::SetFullscreenGate(false));
        assert!(f.coordinator.reminder.is_running());
        assert!(events.iter().any(|e| matches!(e, Event::ReminderResumed { .. })));
        assert!(!f.prefs.snapshot().fullscreen_gate_enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn fullscreen_reading_is_inert_while_the_preference_is_off() {
        let mut f = fixture();
        cmd(&mut f, Command::ReminderEnable);
        f.fullscreen.store(true, Ordering::SeqCst);

        env(&mut f, EnvEvent::AppActivated);
        env(&mut f, EnvEvent::WorkspaceChanged);
        assert!(f.coordinator.reminder.is_running());

        // Turning the preference on samples immediately.
        let events = cmd(&mut f, Command::SetFullscreenGate(true));
        assert!(!f.coordinator.reminder.is_running());
        assert!(events.iter().any(|e| matches!(e, Event::ReminderPaused { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn break_gates_the_reminder_end_to_end() {
        let mut f = fixture();
        cmd(&mut f, Command::SetFocusMinutes(5));
        cmd(&mut f, Command::SetShortBreakMinutes(1));
        cmd(&mut f, Command::ReminderEnable);

        // Run until the third focus phase opens, so two full breaks pass.
        let mut events = cmd(&mut f, Command::CycleStart);
        drive_until(&mut f, &mut events, |evs| {
            count(evs, |e| matches!(e, Event::PhaseChanged { phase: Phase::Focusing, .. })) == 3
        })
        .await;

        // The reminder paused at each break and resumed at each return to
        // focus, never firing anywhere in between.
        assert_eq!(count(&events, |e| matches!(e, Event::ReminderFired { .. })), 0);
        assert_eq!(count(&events, |e| matches!(e, Event::ReminderPaused { .. })), 2);
        assert_eq!(count(&events, |e| matches!(e, Event::ReminderResumed { .. })), 2);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::GateChanged { blocked: true, sources, .. }
                if sources.contains(&crate::gate::GateSource::CycleBreak)
        )));

        let paused_at = events
            .iter()
            .position(|e| matches!(e, Event::ReminderPaused { .. }))
            .unwrap();
        let focus_done_at = events
            .iter()
            .position(|e| matches!(e, Event::FocusCompleted { .. }))
            .unwrap();
        let break_done_at = events
            .iter()
            .position(|e| matches!(e, Event::BreakCompleted { .. }))
            .unwrap();
        let resumed_at = events
            .iter()
            .position(|e| matches!(e, Event::ReminderResumed { .. }))
            .unwrap();
        assert!(focus_done_at < paused_at);
        assert!(paused_at < break_done_at);
        assert!(break_done_at < resumed_at);

        // The resume scheduled a fresh full interval.
        match &events[resumed_at] {
            Event::ReminderResumed { next_fire_at, at } => {
                let lead = (*next_fire_at - *at).num_seconds();
                assert!((1199..=1201).contains(&lead), "lead was {lead}s");
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn enable_during_a_break_is_immediately_regated() {
        let mut f = fixture();
        cmd(&mut f, Command::SetFocusMinutes(5));
        let mut events = cmd(&mut f, Command::CycleStart);
        drive_until(&mut f, &mut events, |evs| {
            count(evs, |e| matches!(e, Event::FocusCompleted { .. })) == 1
        })
        .await;
        assert_eq!(f.coordinator.cycle.phase(), Phase::ShortBreak);

        let events = cmd(&mut f, Command::ReminderEnable);
        assert!(matches!(events[0], Event::ReminderEnabled { .. }));
        assert!(events.iter().any(|e| matches!(e, Event::ReminderPaused { .. })));
        assert!(f.coordinator.reminder.is_enabled());
        assert!(!f.coordinator.reminder.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn pausing_the_cycle_mid_break_keeps_the_reminder_gated() {
        let mut f = fixture();
        cmd(&mut f, Command::SetFocusMinutes(5));
        cmd(&mut f, Command::ReminderEnable);
        let mut events = cmd(&mut f, Command::CycleStart);
        drive_until(&mut f, &mut events, |evs| {
            count(evs, |e| matches!(e, Event::FocusCompleted { .. })) == 1
        })
        .await;
        assert!(!f.coordinator.reminder.is_running());

        // The phase is still a break while its countdown is frozen.
        let events = cmd(&mut f, Command::CyclePause);
        assert!(!events.iter().any(|e| matches!(e, Event::ReminderResumed { .. })));
        let events = cmd(&mut f, Command::CycleStart);
        assert!(!events.iter().any(|e| matches!(e, Event::ReminderResumed { .. })));
        assert!(!f.coordinator.reminder.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_during_a_break_reopens_the_gate() {
        let mut f = fixture();
        cmd(&mut f, Command::SetFocusMinutes(5));
        cmd(&mut f, Command::ReminderEnable);
        let mut events = cmd(&mut f, Command::CycleStart);
        drive_until(&mut f, &mut events, |evs| {
            count(evs, |e| matches!(e, Event::FocusCompleted { .. })) == 1
        })
        .await;
        assert!(!f.coordinator.reminder.is_running());

        let events = cmd(&mut f, Command::CycleReset);
        assert_eq!(f.coordinator.cycle.phase(), Phase::Idle);
        assert_eq!(f.coordinator.cycle.completed_count(), 0);
        assert!(events.iter().any(|e| matches!(e, Event::ReminderResumed { .. })));
        assert!(f.coordinator.reminder.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_now_while_gated_fires_but_stays_paused() {
        let mut f = fixture();
        cmd(&mut f, Command::ReminderEnable);
        env(&mut f, EnvEvent::ScreenLocked);
        assert!(!f.coordinator.reminder.is_running());

        let events = cmd(&mut f, Command::ReminderTriggerNow);
        assert!(matches!(events[0], Event::ReminderFired { .. }));
        assert!(events.iter().any(|e| matches!(e, Event::ReminderPaused { .. })));
        assert!(!f.coordinator.reminder.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn boot_resumes_a_persisted_enabled_reminder() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Arc::new(PrefStore::open(dir.path().join("config.toml")));
        prefs.update(|p| p.reminder_enabled = true);

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut coordinator = Coordinator::new(
            prefs,
            Arc::new(RecordingSink::default()),
            Arc::new(MemorySessionStore::default()),
            Arc::new(SimProbe(Arc::new(AtomicBool::new(false)))),
            tx,
        );

        let events = coordinator.boot();
        assert!(events.iter().any(|e| matches!(e, Event::ReminderResumed { .. })));
        assert!(coordinator.reminder.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn status_snapshot_reflects_current_state() {
        let mut f = fixture();
        cmd(&mut f, Command::ReminderEnable);
        env(&mut f, EnvEvent::ScreenLocked);

        let events = cmd(&mut f, Command::Status);
        match &events[0] {
            Event::Snapshot {
                reminder_enabled,
                reminder_running,
                phase,
                gate_blocked,
                gate_sources,
                ..
            } => {
                assert!(*reminder_enabled);
                assert!(!*reminder_running);
                assert_eq!(*phase, Phase::Idle);
                assert!(*gate_blocked);
                assert_eq!(gate_sources, &vec![crate::gate::GateSource::ScreenLocked]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Arc::new(PrefStore::open(dir.path().join("config.toml")));
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = Coordinator::new(
            prefs,
            Arc::new(RecordingSink::default()),
            Arc::new(MemorySessionStore::default()),
            Arc::new(SimProbe(Arc::new(AtomicBool::new(false)))),
            tx.clone(),
        );

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(coordinator.run(rx, events_tx));

        tx.send(Input::Command(Command::Status)).unwrap();
        tx.send(Input::Command(Command::Shutdown)).unwrap();
        task.await.unwrap();

        assert!(matches!(events_rx.recv().await, Some(Event::Snapshot { .. })));
    }
}
