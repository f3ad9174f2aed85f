mod cycle;
mod primitives;
mod reminder;

pub use cycle::{CycleConfig, CycleEngine, Phase};
pub use primitives::{CountdownTicker, IntervalTimer};
pub use reminder::ReminderEngine;
