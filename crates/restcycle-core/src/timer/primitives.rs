//! Repeating-interval and countdown timer tasks.
//!
//! Both primitives are nothing but a spawned task plus an abort handle.
//! Timer state lives with the owning engine; firings travel through the
//! owner's inbox, and every spawn is tagged with an epoch so the engine
//! can discard deliveries from a timer it has already cancelled. That
//! makes `cancel` safe to treat as synchronous even though the task
//! winds down asynchronously.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Repeating timer: first fire after one full `period`, then every
/// `period` after that.
///
/// Scheduling slack does not accumulate. A delayed fire pushes the next
/// one a full period out rather than firing in a burst.
#[derive(Debug)]
pub struct IntervalTimer {
    task: JoinHandle<()>,
}

impl IntervalTimer {
    pub fn spawn<F>(period: Duration, mut on_fire: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticks = time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                on_fire();
            }
        });
        Self { task }
    }

    /// Stop firing. Idempotent; dropping the timer does the same.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Counts down once per second from `seconds`, delivering each new value
/// (`seconds - 1` down to `0`), then stops on its own.
#[derive(Debug)]
pub struct CountdownTicker {
    task: JoinHandle<()>,
}

impl CountdownTicker {
    pub fn spawn<F>(seconds: u32, mut on_tick: F) -> Self
    where
        F: FnMut(u32) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let second = Duration::from_secs(1);
            let mut ticks = time::interval_at(Instant::now() + second, second);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut remaining = seconds;
            while remaining > 0 {
                ticks.tick().await;
                remaining -= 1;
                on_tick(remaining);
            }
        });
        Self { task }
    }

    /// Stop ticking. Idempotent; dropping the ticker does the same.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
