//! Wiring of the marketplace services.

use super::analytics::{lender_revenue, MonthlyRevenue};
use super::bids::BidDesk;
use super::engine::OrderEngine;
use super::images::ImageStore;
use super::orders::OrderDesk;
use crate::aggregates::order::{OrderAction, OrderEnvironment};
use crate::error::MarketResult;
use crate::lifecycle::{spawn_driver, LifecycleScheduler, LifecycleTimings};
use crate::notifications::{FanOut, Notification, Notifier};
use crate::store::Repositories;
use crate::types::{AccountId, Role};
use librix_core::environment::Clock;
use librix_runtime::{EffectRunner, RunnerError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Everything the HTTP layer calls into.
pub struct Services {
    /// Purchases and rentals
    pub orders: OrderDesk,
    /// Bids and offers
    pub bids: BidDesk,
    /// Notification delivery and inbox
    pub notifier: Notifier,
    /// Restart recovery for lifecycle jobs
    pub scheduler: LifecycleScheduler,
    repos: Repositories,
    clock: Arc<dyn Clock>,
    runner: EffectRunner<OrderAction>,
    driver: JoinHandle<()>,
}

impl Services {
    /// Build the services and spawn the lifecycle driver.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn start(
        repos: Repositories,
        fanout: Arc<dyn FanOut>,
        clock: Arc<dyn Clock>,
        timings: LifecycleTimings,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let (runner, fired) = EffectRunner::new();
        let notifier = Notifier::new(repos.notifications.clone(), fanout, clock.clone());
        let env = OrderEnvironment::new(clock.clone(), repos.jobs.clone(), timings);
        let engine = Arc::new(OrderEngine::new(
            repos.orders.clone(),
            repos.payments.clone(),
            notifier.clone(),
            env,
            runner.clone(),
        ));
        let driver = spawn_driver(engine.clone(), repos.jobs.clone(), fired);

        Self {
            orders: OrderDesk::new(
                repos.catalog.clone(),
                repos.orders.clone(),
                notifier.clone(),
                engine.clone(),
                clock.clone(),
            ),
            bids: BidDesk::new(
                repos.bids.clone(),
                repos.orders.clone(),
                images,
                notifier.clone(),
                engine,
                clock.clone(),
            ),
            scheduler: LifecycleScheduler::new(repos.jobs.clone(), runner.clone(), clock.clone()),
            notifier,
            repos,
            clock,
            runner,
            driver,
        }
    }

    /// Backing repositories
    #[must_use]
    pub const fn repos(&self) -> &Repositories {
        &self.repos
    }

    /// Notifications for `account` acting as `role`, newest first.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub async fn notifications(&self, account: &AccountId, role: Role) -> MarketResult<Vec<Notification>> {
        self.notifier.inbox(account, role).await
    }

    /// Trailing six months of lender revenue.
    ///
    /// # Errors
    ///
    /// Returns the ledger error.
    pub async fn lender_analytics(&self, lender: &AccountId) -> MarketResult<Vec<MonthlyRevenue>> {
        lender_revenue(self.repos.payments.as_ref(), lender, self.clock.now()).await
    }

    /// Whether the lifecycle driver is still running
    #[must_use]
    pub fn driver_alive(&self) -> bool {
        !self.driver.is_finished()
    }

    /// Stop arming timers and abandon the pending ones; their jobs stay
    /// pending for the next start's recovery.
    ///
    /// # Errors
    ///
    /// [`RunnerError::TimersAbandoned`] with the number of abandoned timers.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), RunnerError> {
        self.runner.shutdown(timeout).await
    }
}
