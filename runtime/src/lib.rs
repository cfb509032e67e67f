//! # LibriX Runtime
//!
//! Effect execution for the LibriX marketplace.
//!
//! Reducers in `librix-core` return [`Effect`] descriptions. The
//! [`EffectRunner`] is the imperative half: it awaits `Future` effects in
//! place, spawns a timer for every `Delay`, and sends every action an effect
//! produces into a feedback channel. Whoever owns the receiving end decides how
//! to apply those actions (the marketplace's lifecycle driver feeds them back
//! through the order reducer).
//!
//! ```ignore
//! let (runner, mut feedback) = EffectRunner::new();
//! runner.execute(Effect::delay(Duration::from_secs(300), OrderAction::Dispatch { .. })).await?;
//!
//! while let Some(action) = feedback.recv().await {
//!     // apply the fired action
//! }
//! ```

use futures::future::{join_all, BoxFuture, FutureExt};
use librix_core::effect::Effect;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the effect runner
pub mod error {
    use thiserror::Error;

    /// Errors that can occur while executing effects
    #[derive(Error, Debug, PartialEq, Eq)]
    pub enum RunnerError {
        /// The runner is shutting down and does not start new timers
        #[error("Effect runner is shutting down")]
        ShutdownInProgress,

        /// Nobody is listening for fed-back actions any more
        #[error("Feedback channel closed")]
        FeedbackClosed,

        /// Shutdown abandoned timers that had not fired yet
        #[error("Shutdown abandoned {0} pending timers")]
        TimersAbandoned(usize),
    }
}

pub use error::RunnerError;

/// Decrements the pending counter when a spawned timer finishes or is dropped
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Executes effect descriptions and feeds produced actions back.
///
/// Cloning is cheap; clones share the feedback channel, the pending counter
/// and the shutdown signal.
pub struct EffectRunner<A> {
    feedback: mpsc::UnboundedSender<A>,
    pending: Arc<AtomicUsize>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl<A> Clone for EffectRunner<A> {
    fn clone(&self) -> Self {
        Self {
            feedback: self.feedback.clone(),
            pending: Arc::clone(&self.pending),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

impl<A> EffectRunner<A>
where
    A: Send + std::fmt::Debug + 'static,
{
    /// Create a runner and the receiving end of its feedback channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<A>) {
        let (feedback, rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        (
            Self {
                feedback,
                pending: Arc::new(AtomicUsize::new(0)),
                shutdown: Arc::new(shutdown),
            },
            rx,
        )
    }

    /// Number of timers that have been started and not yet fired.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Whether [`EffectRunner::shutdown`] has been called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Execute a single effect.
    ///
    /// `Future` effects are awaited before this returns, so a `Sequential`
    /// effect can persist a record and only then start a timer. `Delay`
    /// effects return as soon as their timer is spawned.
    ///
    /// # Errors
    ///
    /// - [`RunnerError::ShutdownInProgress`] if a timer is requested after shutdown
    /// - [`RunnerError::FeedbackClosed`] if a produced action has nowhere to go
    pub fn execute(&self, effect: Effect<A>) -> BoxFuture<'_, Result<(), RunnerError>> {
        async move {
            ::metrics::counter!("runner.effects.executed", "type" => effect.kind()).increment(1);

            match effect {
                Effect::None => Ok(()),
                Effect::Future(fut) => {
                    if let Some(action) = fut.await {
                        tracing::trace!(?action, "Effect::Future produced an action");
                        self.feedback
                            .send(action)
                            .map_err(|_| RunnerError::FeedbackClosed)?;
                    }
                    Ok(())
                },
                Effect::Delay { duration, action } => self.spawn_timer(duration, *action),
                Effect::Sequential(effects) => {
                    for effect in effects {
                        self.execute(effect).await?;
                    }
                    Ok(())
                },
                Effect::Parallel(effects) => {
                    let results = join_all(effects.into_iter().map(|e| self.execute(e))).await;
                    results.into_iter().collect()
                },
            }
        }
        .boxed()
    }

    /// Execute effects in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by [`EffectRunner::execute`].
    pub async fn execute_all<I>(&self, effects: I) -> Result<(), RunnerError>
    where
        I: IntoIterator<Item = Effect<A>>,
    {
        for effect in effects {
            self.execute(effect).await?;
        }
        Ok(())
    }

    fn spawn_timer(&self, duration: Duration, action: A) -> Result<(), RunnerError> {
        if self.is_shutting_down() {
            tracing::warn!(?action, "Refusing to start timer during shutdown");
            return Err(RunnerError::ShutdownInProgress);
        }

        tracing::debug!(?duration, ?action, "Starting timer");
        self.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(Arc::clone(&self.pending));
        let feedback = self.feedback.clone();
        let mut stop = self.shutdown.subscribe();

        tokio::spawn(async move {
            let _guard = guard;
            tokio::select! {
                () = tokio::time::sleep(duration) => {
                    ::metrics::counter!("runner.timers.fired").increment(1);
                    if feedback.send(action).is_err() {
                        tracing::warn!("Timer fired after feedback receiver was dropped");
                    }
                }
                _ = stop.changed() => {
                    ::metrics::counter!("runner.timers.abandoned").increment(1);
                    tracing::debug!(?action, "Timer abandoned by shutdown");
                }
            }
        });

        Ok(())
    }

    /// Stop starting new timers and abandon the ones still waiting.
    ///
    /// Waits up to `timeout` for abandoned timer tasks to unwind.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::TimersAbandoned`] with the number of timers that
    /// were pending when shutdown began, so the caller can log what will need
    /// recovery on the next start.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), RunnerError> {
        let pending = self.pending_timers();
        self.shutdown.send_replace(true);

        let deadline = tokio::time::Instant::now() + timeout;
        while self.pending_timers() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        if pending == 0 {
            Ok(())
        } else {
            Err(RunnerError::TimersAbandoned(pending))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Step {
        First,
        Second,
    }

    #[tokio::test]
    async fn test_future_action_is_fed_back() {
        let (runner, mut rx) = EffectRunner::new();

        runner
            .execute(Effect::future(async { Some(Step::First) }))
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(Step::First));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_fires_after_duration() {
        let (runner, mut rx) = EffectRunner::new();

        runner
            .execute(Effect::delay(Duration::from_secs(300), Step::Second))
            .await
            .unwrap();
        assert_eq!(runner.pending_timers(), 1);
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.recv().await, Some(Step::Second));
        assert_eq!(runner.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_runs_in_order() {
        let (runner, mut rx) = EffectRunner::new();

        runner
            .execute(Effect::chain(vec![
                Effect::future(async { Some(Step::First) }),
                Effect::delay(Duration::from_secs(1), Step::Second),
            ]))
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(Step::First));
        assert_eq!(rx.recv().await, Some(Step::Second));
    }

    #[tokio::test]
    async fn test_parallel_runs_all() {
        let (runner, mut rx) = EffectRunner::new();

        runner
            .execute(Effect::merge(vec![
                Effect::future(async { Some(Step::First) }),
                Effect::future(async { Some(Step::Second) }),
                Effect::None,
            ]))
            .await
            .unwrap();

        let mut received = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        received.sort_by_key(|s| format!("{s:?}"));
        assert_eq!(received, vec![Step::First, Step::Second]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_pending_timers() {
        let (runner, mut rx) = EffectRunner::new();

        runner
            .execute(Effect::delay(Duration::from_secs(300), Step::First))
            .await
            .unwrap();

        let result = runner.shutdown(Duration::from_secs(1)).await;
        assert_eq!(result, Err(RunnerError::TimersAbandoned(1)));
        assert_eq!(runner.pending_timers(), 0);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(rx.try_recv().is_err());

        let refused = runner
            .execute(Effect::delay(Duration::from_secs(1), Step::Second))
            .await;
        assert_eq!(refused, Err(RunnerError::ShutdownInProgress));
    }

    #[tokio::test]
    async fn test_feedback_closed_is_reported() {
        let (runner, rx) = EffectRunner::new();
        drop(rx);

        let result = runner
            .execute(Effect::future(async { Some(Step::First) }))
            .await;
        assert_eq!(result, Err(RunnerError::FeedbackClosed));
    }
}
