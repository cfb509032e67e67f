//! Lifecycle driver and restart recovery.

use super::job::JobState;
use crate::aggregates::order::OrderAction;
use crate::app::engine::OrderEngine;
use crate::error::{MarketError, MarketResult};
use crate::store::JobStore;
use librix_core::{effect::Effect, environment::Clock};
use librix_runtime::EffectRunner;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Apply fired lifecycle actions, one at a time, until the feedback channel
/// closes.
///
/// A failing step is logged and its job closed as aborted. It is never
/// retried and never stops the driver.
pub fn spawn_driver(
    engine: Arc<OrderEngine>,
    jobs: Arc<dyn JobStore>,
    mut fired: UnboundedReceiver<OrderAction>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(action) = fired.recv().await {
            apply(&engine, jobs.as_ref(), action).await;
        }
        debug!("Lifecycle driver stopped");
    })
}

async fn apply(engine: &OrderEngine, jobs: &dyn JobStore, action: OrderAction) {
    let step = action.label();
    let order_id = action.order_id();
    let job_id = action.job_id();

    match engine.dispatch(action).await {
        Ok(order) => {
            metrics::counter!("lifecycle.steps", "step" => step).increment(1);
            info!(%order_id, step, status = %order.status, "Lifecycle step applied");
        },
        Err(error) => {
            match &error {
                MarketError::NotFound { .. } => {
                    warn!(%order_id, step, "Order vanished before lifecycle step");
                },
                _ => error!(%order_id, step, %error, "Lifecycle step failed"),
            }
            if let Some(job_id) = job_id {
                metrics::counter!("lifecycle.aborted").increment(1);
                if let Err(error) = jobs.finish(job_id, JobState::Aborted).await {
                    warn!(%job_id, %error, "Failed to close lifecycle job");
                }
            }
        },
    }
}

/// Re-arms persisted jobs after a restart.
#[derive(Clone)]
pub struct LifecycleScheduler {
    jobs: Arc<dyn JobStore>,
    runner: EffectRunner<OrderAction>,
    clock: Arc<dyn Clock>,
}

impl LifecycleScheduler {
    /// Creates a new `LifecycleScheduler`
    #[must_use]
    pub fn new(jobs: Arc<dyn JobStore>, runner: EffectRunner<OrderAction>, clock: Arc<dyn Clock>) -> Self {
        Self { jobs, runner, clock }
    }

    /// Start a timer for every pending job with its remaining delay (zero if
    /// overdue). Returns how many were re-armed.
    ///
    /// # Errors
    ///
    /// Returns the store error, or [`MarketError::Internal`] if the runner is
    /// already shutting down.
    pub async fn recover(&self) -> MarketResult<usize> {
        let now = self.clock.now();
        let pending = self.jobs.pending().await?;

        for job in &pending {
            let delay = job.remaining(now);
            debug!(job_id = %job.id, order_id = %job.order_id, step = job.step.as_str(), ?delay, "Re-arming lifecycle job");
            self.runner
                .execute(Effect::delay(
                    delay,
                    OrderAction::for_step(job.step, job.order_id, job.id),
                ))
                .await?;
            metrics::counter!("lifecycle.recovered").increment(1);
        }

        if !pending.is_empty() {
            info!(count = pending.len(), "Recovered pending lifecycle jobs");
        }
        Ok(pending.len())
    }

    /// Whether timers can still be started
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        !self.runner.is_shutting_down()
    }

    /// Timers armed and not fired yet
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.runner.pending_timers()
    }
}
