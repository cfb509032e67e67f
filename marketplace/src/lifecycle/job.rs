//! Records of armed lifecycle steps, kept in the job store.

use crate::types::{JobId, OrderId, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay for each step (5 minutes).
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_secs(5 * 60);

/// A timed step in the delivery sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStep {
    /// accepted → `out_for_delivery`, payment captured
    Dispatch,
    /// `out_for_delivery` → delivered
    Deliver,
}

impl LifecycleStep {
    /// Status the order must still be in when the step fires
    #[must_use]
    pub const fn expects(self) -> OrderStatus {
        match self {
            Self::Dispatch => OrderStatus::Accepted,
            Self::Deliver => OrderStatus::OutForDelivery,
        }
    }

    /// Label for logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dispatch => "dispatch",
            Self::Deliver => "deliver",
        }
    }
}

/// Where a job is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Timer armed, not fired yet
    Pending,
    /// Step applied
    Completed,
    /// Step found the order in another status and left it alone
    Aborted,
}

/// A step that will fire at `due_at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    /// Job id, carried by the fired action
    pub id: JobId,
    /// Order to advance
    pub order_id: OrderId,
    /// Step to apply
    pub step: LifecycleStep,
    /// When the timer expires
    pub due_at: DateTime<Utc>,
    /// Current state
    pub state: JobState,
}

impl ScheduledJob {
    /// A pending job due `delay` after `now`
    #[must_use]
    pub fn pending(order_id: OrderId, step: LifecycleStep, now: DateTime<Utc>, delay: Duration) -> Self {
        let delay = chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            id: JobId::new(),
            order_id,
            step,
            due_at: now + delay,
            state: JobState::Pending,
        }
    }

    /// Time left until `due_at`, zero if overdue
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.due_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Delay before each step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LifecycleTimings {
    /// From arming to dispatch
    pub dispatch_after: Duration,
    /// From dispatch to delivery
    pub deliver_after: Duration,
}

impl LifecycleTimings {
    /// Same delay for both steps
    #[must_use]
    pub const fn from_step_secs(secs: u64) -> Self {
        Self {
            dispatch_after: Duration::from_secs(secs),
            deliver_after: Duration::from_secs(secs),
        }
    }

    /// Delay before `step`
    #[must_use]
    pub const fn delay_for(&self, step: LifecycleStep) -> Duration {
        match step {
            LifecycleStep::Dispatch => self.dispatch_after,
            LifecycleStep::Deliver => self.deliver_after,
        }
    }
}

impl Default for LifecycleTimings {
    fn default() -> Self {
        Self {
            dispatch_after: DEFAULT_STEP_DELAY,
            deliver_after: DEFAULT_STEP_DELAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use librix_core::environment::Clock;
    use librix_testing::{test_clock, ManualClock};

    #[test]
    fn test_remaining_is_zero_when_overdue() {
        let clock = ManualClock::new(test_clock().now());
        let job = ScheduledJob::pending(OrderId::new(), LifecycleStep::Dispatch, clock.now(), DEFAULT_STEP_DELAY);

        assert_eq!(job.remaining(clock.now()), DEFAULT_STEP_DELAY);

        clock.advance(chrono::Duration::minutes(2));
        assert_eq!(job.remaining(clock.now()), Duration::from_secs(180));

        clock.advance(chrono::Duration::minutes(7));
        assert_eq!(job.remaining(clock.now()), Duration::ZERO);
    }

    #[test]
    fn test_step_predecessors() {
        assert_eq!(LifecycleStep::Dispatch.expects(), OrderStatus::Accepted);
        assert_eq!(LifecycleStep::Deliver.expects(), OrderStatus::OutForDelivery);
    }

    #[test]
    fn test_default_timings_are_five_minutes() {
        let timings = LifecycleTimings::default();
        assert_eq!(timings.delay_for(LifecycleStep::Dispatch), Duration::from_secs(300));
        assert_eq!(LifecycleTimings::from_step_secs(2).deliver_after, Duration::from_secs(2));
    }
}
