//! Timed delivery sequence for accepted orders.
//!
//! ```text
//! accept ──(dispatch_after)──▶ dispatch ──(deliver_after)──▶ deliver
//! ```
//!
//! Each step is a [`job::ScheduledJob`] persisted before its timer starts.
//! Timers run on the [`librix_runtime::EffectRunner`]; fired actions come back
//! on its feedback channel and the single driver task spawned by
//! [`scheduler::spawn_driver`] applies them one at a time.

pub mod job;
pub mod scheduler;

pub use job::{JobState, LifecycleStep, LifecycleTimings, ScheduledJob, DEFAULT_STEP_DELAY};
pub use scheduler::{spawn_driver, LifecycleScheduler};
