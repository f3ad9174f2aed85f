//! Interactive coordinator session.
//!
//! Stdout carries the event stream; stderr carries diagnostics. Stdin is
//! a line-oriented console: timer commands, preference changes, and
//! simulated environment signals (`lock`, `sleep`, `fullscreen on`) so
//! the gating behavior can be exercised from any terminal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use restcycle_core::{
    Command, Coordinator, Database, DesktopSink, EnvEvent, EnvironmentProbe, Event, HyprlandProbe,
    Input, LogSink, NotificationSink, Phase, PrefStore, SqliteSessionStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Fullscreen switch for sessions without a compositor. Toggled by the
/// `fullscreen on|off` console command.
struct ManualProbe(AtomicBool);

impl EnvironmentProbe for ManualProbe {
    fn is_fullscreen_active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn run(no_desktop_notifications: bool) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(no_desktop_notifications))
}

async fn serve(no_desktop_notifications: bool) -> Result<(), Box<dyn std::error::Error>> {
    let prefs = Arc::new(PrefStore::open_default()?);
    let sessions = Arc::new(SqliteSessionStore::spawn(Database::open()?));
    let sink: Arc<dyn NotificationSink> = if no_desktop_notifications {
        Arc::new(LogSink)
    } else {
        Arc::new(DesktopSink)
    };

    let manual = Arc::new(ManualProbe(AtomicBool::new(false)));
    let probe: Arc<dyn EnvironmentProbe> =
        if std::env::var_os("HYPRLAND_INSTANCE_SIGNATURE").is_some() {
            tracing::info!("using hyprctl for fullscreen detection");
            Arc::new(HyprlandProbe)
        } else {
            manual.clone()
        };

    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let coordinator = Coordinator::new(prefs, sink, sessions, probe, inbox_tx.clone());

    let engine = tokio::spawn(coordinator.run(inbox_rx, events_tx));
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            println!("{}", render(&event));
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = lines.next_line().await? else {
            // Stdin closed; wind the engine down.
            let _ = inbox_tx.send(Input::Command(Command::Shutdown));
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse(line, &manual) {
            Parsed::Input(input) => {
                let quitting = matches!(input, Input::Command(Command::Shutdown));
                let _ = inbox_tx.send(input);
                if quitting {
                    break;
                }
            }
            Parsed::Help => print_help(),
            Parsed::Unknown => eprintln!("unknown command: {line} (try `help`)"),
        }
    }

    engine.await?;
    printer.await?;
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Parsed {
    Input(Input),
    Help,
    Unknown,
}

fn parse(line: &str, manual: &ManualProbe) -> Parsed {
    let mut words = line.split_whitespace();
    let head = words.next().unwrap_or_default();
    let arg = words.next();
    if words.next().is_some() {
        return Parsed::Unknown;
    }

    let command = match (head, arg) {
        ("enable", None) => Command::ReminderEnable,
        ("disable", None) => Command::ReminderDisable,
        ("toggle", None) => Command::ReminderToggle,
        ("trigger", None) => Command::ReminderTriggerNow,
        ("interval", Some(n)) => match n.parse() {
            Ok(n) => Command::ReminderSetInterval(n),
            Err(_) => return Parsed::Unknown,
        },
        ("start", None) => Command::CycleStart,
        ("pause", None) => Command::CyclePause,
        ("reset", None) => Command::CycleReset,
        ("focus", Some(n)) => match n.parse() {
            Ok(n) => Command::SetFocusMinutes(n),
            Err(_) => return Parsed::Unknown,
        },
        ("short", Some(n)) => match n.parse() {
            Ok(n) => Command::SetShortBreakMinutes(n),
            Err(_) => return Parsed::Unknown,
        },
        ("long", Some(n)) => match n.parse() {
            Ok(n) => Command::SetLongBreakMinutes(n),
            Err(_) => return Parsed::Unknown,
        },
        ("cycles", Some(n)) => match n.parse() {
            Ok(n) => Command::SetCyclesBeforeLongBreak(n),
            Err(_) => return Parsed::Unknown,
        },
        ("gate", Some(flag)) => match on_off(flag) {
            Some(enabled) => Command::SetFullscreenGate(enabled),
            None => return Parsed::Unknown,
        },
        ("fullscreen", Some(flag)) => match on_off(flag) {
            Some(active) => {
                // Update the simulated probe, then have the gate sample it.
                manual.0.store(active, Ordering::SeqCst);
                return Parsed::Input(Input::Env(EnvEvent::AppActivated));
            }
            None => return Parsed::Unknown,
        },
        ("sleep", None) => return Parsed::Input(Input::Env(EnvEvent::DisplaySlept)),
        ("wake", None) => return Parsed::Input(Input::Env(EnvEvent::DisplayWoke)),
        ("lock", None) => return Parsed::Input(Input::Env(EnvEvent::ScreenLocked)),
        ("unlock", None) => return Parsed::Input(Input::Env(EnvEvent::ScreenUnlocked)),
        ("appswitch", None) => return Parsed::Input(Input::Env(EnvEvent::AppActivated)),
        ("space", None) => return Parsed::Input(Input::Env(EnvEvent::WorkspaceChanged)),
        ("status", None) => Command::Status,
        ("quit" | "exit", None) => Command::Shutdown,
        ("help", None) => return Parsed::Help,
        _ => return Parsed::Unknown,
    };
    Parsed::Input(Input::Command(command))
}

fn on_off(flag: &str) -> Option<bool> {
    match flag {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

fn print_help() {
    println!(
        "\
reminder:     enable | disable | toggle | trigger | interval <min>
cycle:        start | pause | reset
durations:    focus <min> | short <min> | long <min> | cycles <n>
gating:       gate on|off | fullscreen on|off
environment:  sleep | wake | lock | unlock | appswitch | space
other:        status | help | quit"
    );
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "idle",
        Phase::Focusing => "focus",
        Phase::ShortBreak => "short break",
        Phase::LongBreak => "long break",
    }
}

fn clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn local_time(t: &DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn sources(list: &[restcycle_core::GateSource]) -> String {
    use restcycle_core::GateSource;
    list.iter()
        .map(|s| match s {
            GateSource::CycleBreak => "break",
            GateSource::DisplayAsleep => "display asleep",
            GateSource::ScreenLocked => "screen locked",
            GateSource::AppFullscreen => "fullscreen app",
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render(event: &Event) -> String {
    match event {
        Event::ReminderEnabled {
            interval_minutes,
            next_fire_at,
            ..
        } => format!(
            "reminder enabled, every {interval_minutes} min, next at {}",
            local_time(next_fire_at)
        ),
        Event::ReminderDisabled { .. } => "reminder disabled".into(),
        Event::ReminderIntervalChanged { minutes, .. } => {
            format!("reminder interval set to {minutes} min")
        }
        Event::ReminderPaused { .. } => "reminder paused".into(),
        Event::ReminderResumed { next_fire_at, .. } => {
            format!("reminder resumed, next at {}", local_time(next_fire_at))
        }
        Event::ReminderFired { next_fire_at, .. } => match next_fire_at {
            Some(next) => format!("reminder fired, next at {}", local_time(next)),
            None => "reminder fired".into(),
        },
        Event::PhaseChanged {
            phase,
            seconds_remaining,
            ..
        } => format!("{}, {} left", phase_name(*phase), clock(*seconds_remaining)),
        Event::CyclePaused {
            phase,
            seconds_remaining,
            ..
        } => format!(
            "cycle paused in {} with {} left",
            phase_name(*phase),
            clock(*seconds_remaining)
        ),
        Event::CycleResumed {
            phase,
            seconds_remaining,
            ..
        } => format!(
            "cycle resumed in {}, {} left",
            phase_name(*phase),
            clock(*seconds_remaining)
        ),
        Event::CycleReset { .. } => "cycle reset".into(),
        Event::FocusCompleted {
            completed_count, ..
        } => format!("focus session #{completed_count} complete"),
        Event::BreakCompleted { .. } => "break finished".into(),
        Event::MinutesRemaining { minutes, .. } => format!("{minutes} min remaining"),
        Event::GateChanged {
            blocked, sources: s, ..
        } => {
            if *blocked {
                format!("reminder gated: {}", sources(s))
            } else {
                "gates clear".into()
            }
        }
        Event::Snapshot { .. } => serde_json::to_string_pretty(event)
            .unwrap_or_else(|e| format!("snapshot unavailable: {e}")),
    }
}
