//! # Restcycle Core Library
//!
//! This library provides the core logic for Restcycle, a rest-break
//! coordinator that runs two timers side by side: a recurring eye-rest
//! reminder and a focus/break work cycle. All operations are available
//! through a standalone CLI binary; any GUI shell is expected to be a
//! thin layer over this same library.
//!
//! ## Architecture
//!
//! - **Timer engines**: tokio-task based interval and countdown
//!   primitives driving two independent state machines
//! - **Coordinator**: a single serialized inbox that applies commands,
//!   environment signals, and timer deliveries in arrival order
//! - **Gating**: explicit per-source flags folded into one effective
//!   pause/resume decision for the reminder
//! - **Storage**: SQLite-based session history and TOML-based
//!   preferences
//!
//! ## Key Components
//!
//! - [`Coordinator`]: owns both engines and arbitrates the gates
//! - [`ReminderEngine`] / [`CycleEngine`]: the two timer state machines
//! - [`Database`]: session history and statistics persistence
//! - [`PrefStore`]: validated, write-through preferences

pub mod coordinator;
pub mod error;
pub mod events;
pub mod gate;
pub mod notify;
pub mod probe;
pub mod storage;
pub mod timer;

pub use coordinator::{Command, Coordinator, EnvEvent, Input};
pub use error::{ConfigError, CoreError, Result, StoreError};
pub use events::Event;
pub use gate::{GateFlags, GateSource};
pub use notify::{DesktopSink, LogSink, NotificationKind, NotificationSink};
pub use probe::{EnvironmentProbe, HyprlandProbe, NullProbe};
pub use storage::{
    Database, MemorySessionStore, PrefStore, Preferences, SessionRecord, SessionStore,
    SqliteSessionStore, Stats,
};
pub use timer::{CycleConfig, CycleEngine, Phase, ReminderEngine};
