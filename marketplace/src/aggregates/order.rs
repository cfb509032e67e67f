//! Order aggregate: purchases, rentals and bid-fulfilled orders.
//!
//! All three variants share one state machine:
//!
//! ```text
//! pending ──accept──▶ accepted ──(dispatch)──▶ out_for_delivery ──(deliver)──▶ delivered
//!    │                                                                            │
//!    └──decline──▶ cancelled                                       rental ──▶ returned
//! ```
//!
//! Purchases wait for the seller's answer. Rentals and bid orders are created
//! `accepted` and armed on creation. Accepting arms the dispatch step; a
//! completed dispatch arms the deliver step. Each armed step is a durable job written before its timer starts, and
//! each firing checks that the order is still in the status the step expects.
//!
//! The reducer stays pure: side effects on other records (notifications,
//! request settlement, room nudges, lender payments) are queued in
//! [`OrderState::outbox`] for the shell to perform in order. Timers and job
//! bookkeeping are returned as [`Effect`]s.

use crate::aggregates::bid::{Bid, Offer};
use crate::aggregates::listing::{Book, LendBook};
use crate::aggregates::payment::LendPayment;
use crate::error::{MarketError, MarketResult};
use crate::lifecycle::job::{JobState, LifecycleStep, LifecycleTimings, ScheduledJob};
use crate::notifications::fanout::RoomKey;
use crate::notifications::model::{NotificationDraft, SnapshotStatus};
use crate::notifications::templates;
use crate::store::JobStore;
use crate::types::{
    AccountId, Decision, JobId, ListingRef, Money, OrderId, OrderKind, OrderStatus, PaymentStatus,
    Role,
};
use chrono::{DateTime, Utc};
use librix_core::{effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Order
// ============================================================================

/// Rental-only terms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalTerms {
    /// Rental length in weeks
    pub duration_weeks: u32,
    /// When the book is due back
    pub due_date: DateTime<Utc>,
}

/// A transaction between a buyer and a seller or lender.
///
/// `listing`, `buyer` and `counterparty` never change after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order id
    pub id: OrderId,
    /// Variant, derived from the listing
    #[serde(rename = "orderType")]
    pub kind: OrderKind,
    /// Item transacted
    pub listing: ListingRef,
    /// Item title at the time of ordering
    pub title: String,
    /// Buying account
    pub buyer: AccountId,
    /// Selling or lending account
    pub counterparty: AccountId,
    /// Role of the counterparty
    pub counterparty_role: Role,
    /// Total price
    pub amount: Money,
    /// Rental terms (rentals only)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rental: Option<RentalTerms>,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Payment capture status
    pub payment_status: PaymentStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl Order {
    fn new(
        listing: ListingRef,
        title: String,
        buyer: AccountId,
        counterparty: AccountId,
        counterparty_role: Role,
        amount: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            kind: listing.kind(),
            listing,
            title,
            buyer,
            counterparty,
            counterparty_role,
            amount,
            rental: None,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            created_at: now,
            updated_at: now,
        }
    }

    /// A pending purchase of a book for sale
    #[must_use]
    pub fn purchase(book: &Book, buyer: AccountId, now: DateTime<Utc>) -> Self {
        Self::new(
            ListingRef::Book(book.id),
            book.title.clone(),
            buyer,
            book.seller.clone(),
            Role::Seller,
            book.price,
            now,
        )
    }

    /// A rental of a lend book, accepted on placement.
    ///
    /// The amount is the weekly price times `weeks`; the book is due back
    /// `weeks` weeks from now. Rentals need no lender answer, so the order
    /// starts `accepted` and is armed right away.
    ///
    /// # Errors
    ///
    /// [`MarketError::Validation`] if `weeks` is zero or the amount or due
    /// date is out of range.
    pub fn rental(
        book: &LendBook,
        buyer: AccountId,
        weeks: u32,
        now: DateTime<Utc>,
    ) -> MarketResult<Self> {
        if weeks == 0 {
            return Err(MarketError::Validation(
                "Duration must be at least one week".to_string(),
            ));
        }

        let amount = book
            .rent_price_per_week
            .checked_multiply(weeks)
            .ok_or_else(|| MarketError::Validation("Rental amount is too large".to_string()))?;
        let due_date = chrono::Duration::try_weeks(i64::from(weeks))
            .and_then(|span| now.checked_add_signed(span))
            .ok_or_else(|| MarketError::Validation("Rental duration is too long".to_string()))?;

        let mut order = Self::new(
            ListingRef::LendBook(book.id),
            book.title.clone(),
            buyer,
            book.lender.clone(),
            Role::Lender,
            amount,
            now,
        );
        order.rental = Some(RentalTerms {
            duration_weeks: weeks,
            due_date,
        });
        order.status = OrderStatus::Accepted;
        Ok(order)
    }

    /// An accepted order for an offer the buyer took.
    #[must_use]
    pub fn from_offer(offer: &Offer, bid: &Bid, now: DateTime<Utc>) -> Self {
        let mut order = Self::new(
            ListingRef::Bid(bid.id),
            bid.book_name.clone(),
            offer.buyer.clone(),
            offer.seller.clone(),
            Role::Seller,
            offer.price,
            now,
        );
        order.status = OrderStatus::Accepted;
        order
    }

    /// Whether this is a rental
    #[must_use]
    pub fn is_rental(&self) -> bool {
        self.kind == OrderKind::Rental
    }

    /// Room of the seller or lender
    #[must_use]
    pub fn counterparty_room(&self) -> RoomKey {
        RoomKey::new(self.counterparty_role, &self.counterparty)
    }

    fn is_counterparty(&self, account: &AccountId, role: Role) -> bool {
        &self.counterparty == account && self.counterparty_role == role
    }

    fn reference(&self) -> Uuid {
        *self.id.as_uuid()
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Commands applied to one order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderAction {
    /// Seller accepts or declines a pending purchase
    Respond {
        /// Order id
        order_id: OrderId,
        /// Accept or decline
        decision: Decision,
        /// Account responding
        responder: AccountId,
        /// Role the responder acts in
        responder_role: Role,
    },

    /// Start the delivery sequence of an order created already accepted
    Arm {
        /// Order id
        order_id: OrderId,
    },

    /// First timed step: out for delivery, payment captured
    Dispatch {
        /// Order id
        order_id: OrderId,
        /// Job that fired
        job_id: JobId,
    },

    /// Second timed step: delivered
    Deliver {
        /// Order id
        order_id: OrderId,
        /// Job that fired
        job_id: JobId,
    },

    /// Lender marks a delivered rental as returned
    MarkReturned {
        /// Order id
        order_id: OrderId,
        /// Account responding
        responder: AccountId,
    },
}

impl OrderAction {
    /// Order the action targets
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        match self {
            Self::Respond { order_id, .. }
            | Self::Arm { order_id }
            | Self::Dispatch { order_id, .. }
            | Self::Deliver { order_id, .. }
            | Self::MarkReturned { order_id, .. } => *order_id,
        }
    }

    /// Job behind a timed step
    #[must_use]
    pub const fn job_id(&self) -> Option<JobId> {
        match self {
            Self::Dispatch { job_id, .. } | Self::Deliver { job_id, .. } => Some(*job_id),
            Self::Respond { .. } | Self::Arm { .. } | Self::MarkReturned { .. } => None,
        }
    }

    /// Action fired when a job of `step` expires
    #[must_use]
    pub const fn for_step(step: LifecycleStep, order_id: OrderId, job_id: JobId) -> Self {
        match step {
            LifecycleStep::Dispatch => Self::Dispatch { order_id, job_id },
            LifecycleStep::Deliver => Self::Deliver { order_id, job_id },
        }
    }

    /// Short label for logs and metrics
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Respond { .. } => "respond",
            Self::Arm { .. } => "arm",
            Self::Dispatch { .. } => "dispatch",
            Self::Deliver { .. } => "deliver",
            Self::MarkReturned { .. } => "mark_returned",
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Side effect on another record, performed by the shell after the order is
/// persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outgoing {
    /// Store and push a notification
    Notify(NotificationDraft),
    /// Patch the status snapshot of a request notification
    SettleRequest {
        /// Order or offer id the request refers to
        reference: Uuid,
        /// New snapshot
        status: SnapshotStatus,
    },
    /// Payload-less refresh signal to a room
    Nudge(RoomKey),
    /// Record a lender payment
    RecordPayment(LendPayment),
}

/// One order plus what the last action decided.
#[derive(Clone, Debug)]
pub struct OrderState {
    /// The order
    pub order: Order,
    /// Side effects queued for the shell, in order
    pub outbox: Vec<Outgoing>,
    /// Why the last action was rejected
    pub last_error: Option<MarketError>,
}

impl OrderState {
    /// Wrap a loaded order
    #[must_use]
    pub const fn new(order: Order) -> Self {
        Self {
            order,
            outbox: Vec::new(),
            last_error: None,
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the order reducer.
#[derive(Clone)]
pub struct OrderEnvironment {
    /// Clock for timestamps and job due times
    pub clock: Arc<dyn Clock>,
    /// Durable job records
    pub jobs: Arc<dyn JobStore>,
    /// Step delays
    pub timings: LifecycleTimings,
}

impl OrderEnvironment {
    /// Creates a new `OrderEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, jobs: Arc<dyn JobStore>, timings: LifecycleTimings) -> Self {
        Self {
            clock,
            jobs,
            timings,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the order state machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderReducer;

type Effects = SmallVec<[Effect<OrderAction>; 4]>;

impl OrderReducer {
    /// Creates a new `OrderReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn reject(state: &mut OrderState, error: MarketError) -> Effects {
        state.last_error = Some(error);
        SmallVec::new()
    }

    fn require_status(order: &Order, expected: OrderStatus) -> MarketResult<()> {
        if order.status == expected {
            Ok(())
        } else {
            Err(MarketError::InvalidTransition(format!(
                "Order {} is {}, expected {expected}",
                order.id, order.status
            )))
        }
    }

    /// Write the job record, then start its timer.
    fn schedule(env: &OrderEnvironment, order_id: OrderId, step: LifecycleStep) -> Effect<OrderAction> {
        let delay = env.timings.delay_for(step);
        let job = ScheduledJob::pending(order_id, step, env.clock.now(), delay);
        let action = OrderAction::for_step(step, order_id, job.id);
        let jobs = Arc::clone(&env.jobs);

        Effect::chain(vec![
            Effect::future(async move {
                if let Err(error) = jobs.insert(job).await {
                    tracing::error!(%order_id, %error, "Failed to persist lifecycle job");
                }
                None
            }),
            Effect::delay(delay, action),
        ])
    }

    fn finish(env: &OrderEnvironment, job_id: JobId, outcome: JobState) -> Effect<OrderAction> {
        let jobs = Arc::clone(&env.jobs);
        Effect::future(async move {
            if outcome == JobState::Aborted {
                metrics::counter!("lifecycle.aborted").increment(1);
            }
            if let Err(error) = jobs.finish(job_id, outcome).await {
                tracing::warn!(%job_id, %error, "Failed to close lifecycle job");
            }
            None
        })
    }

    fn respond(
        state: &mut OrderState,
        decision: Decision,
        responder: &AccountId,
        responder_role: Role,
        env: &OrderEnvironment,
    ) -> Effects {
        let order = &mut state.order;
        if !order.is_counterparty(responder, responder_role) {
            return Self::reject(
                state,
                MarketError::Forbidden(format!(
                    "Only the {} of this order can respond to it",
                    state.order.counterparty_role
                )),
            );
        }
        if let Err(error) = Self::require_status(order, OrderStatus::Pending) {
            return Self::reject(state, error);
        }

        order.status = match decision {
            Decision::Accept => OrderStatus::Accepted,
            Decision::Decline => OrderStatus::Cancelled,
        };
        order.updated_at = env.clock.now();

        let reference = order.reference();
        let draft = match decision {
            Decision::Accept => templates::order_confirmed(order),
            Decision::Decline => templates::order_cancelled(order),
        };
        state.outbox.push(Outgoing::SettleRequest {
            reference,
            status: SnapshotStatus::Order(order.status),
        });
        state.outbox.push(Outgoing::Notify(draft));
        state.outbox.push(Outgoing::Nudge(order.counterparty_room()));
        state.last_error = None;

        match decision {
            Decision::Accept => smallvec![Self::schedule(env, order.id, LifecycleStep::Dispatch)],
            Decision::Decline => SmallVec::new(),
        }
    }

    /// A step whose order diverged closes its job and changes nothing.
    fn abort_step(env: &OrderEnvironment, order: &Order, step: LifecycleStep, job_id: JobId) -> Effects {
        tracing::warn!(
            order_id = %order.id,
            %job_id,
            step = step.as_str(),
            status = %order.status,
            "Lifecycle step no longer applies, aborting"
        );
        smallvec![Self::finish(env, job_id, JobState::Aborted)]
    }

    fn dispatch(state: &mut OrderState, job_id: JobId, env: &OrderEnvironment) -> Effects {
        let step = LifecycleStep::Dispatch;
        if state.order.status != step.expects() {
            return Self::abort_step(env, &state.order, step, job_id);
        }

        let now = env.clock.now();
        let order = &mut state.order;
        order.status = OrderStatus::OutForDelivery;
        order.payment_status = PaymentStatus::Paid;
        order.updated_at = now;

        state.outbox.push(Outgoing::Notify(templates::payment_received(order)));
        state.outbox.push(Outgoing::Notify(templates::out_for_delivery(order)));
        if order.is_rental() {
            state.outbox.push(Outgoing::RecordPayment(LendPayment::received(
                order.id,
                order.counterparty.clone(),
                order.amount,
                now,
            )));
        }
        state.last_error = None;

        smallvec![Effect::chain(vec![
            Self::finish(env, job_id, JobState::Completed),
            Self::schedule(env, order.id, LifecycleStep::Deliver),
        ])]
    }

    fn deliver(state: &mut OrderState, job_id: JobId, env: &OrderEnvironment) -> Effects {
        let step = LifecycleStep::Deliver;
        if state.order.status != step.expects() {
            return Self::abort_step(env, &state.order, step, job_id);
        }

        let order = &mut state.order;
        order.status = OrderStatus::Delivered;
        order.updated_at = env.clock.now();

        state.outbox.push(Outgoing::Notify(templates::delivered(order)));
        state.last_error = None;

        smallvec![Self::finish(env, job_id, JobState::Completed)]
    }

    fn mark_returned(state: &mut OrderState, responder: &AccountId, env: &OrderEnvironment) -> Effects {
        if !state.order.is_counterparty(responder, Role::Lender) {
            return Self::reject(
                state,
                MarketError::Forbidden("Only the lender of this rental can mark it returned".to_string()),
            );
        }
        if !state.order.is_rental() {
            return Self::reject(
                state,
                MarketError::InvalidTransition("Only rentals can be returned".to_string()),
            );
        }
        if let Err(error) = Self::require_status(&state.order, OrderStatus::Delivered) {
            return Self::reject(state, error);
        }

        let order = &mut state.order;
        order.status = OrderStatus::Returned;
        order.updated_at = env.clock.now();

        state.outbox.push(Outgoing::Notify(templates::returned(order)));
        state.last_error = None;
        SmallVec::new()
    }
}

impl Reducer for OrderReducer {
    type State = OrderState;
    type Action = OrderAction;
    type Environment = OrderEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            OrderAction::Respond {
                decision,
                responder,
                responder_role,
                ..
            } => Self::respond(state, decision, &responder, responder_role, env),

            OrderAction::Arm { order_id } => {
                if let Err(error) = Self::require_status(&state.order, OrderStatus::Accepted) {
                    return Self::reject(state, error);
                }
                state.last_error = None;
                smallvec![Self::schedule(env, order_id, LifecycleStep::Dispatch)]
            },

            OrderAction::Dispatch { job_id, .. } => Self::dispatch(state, job_id, env),

            OrderAction::Deliver { job_id, .. } => Self::deliver(state, job_id, env),

            OrderAction::MarkReturned { responder, .. } => {
                Self::mark_returned(state, &responder, env)
            },
        }
    }
}
