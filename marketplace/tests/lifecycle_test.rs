//! Timed delivery sequence tests.
//!
//! Run on a paused Tokio clock: sleeping past a step's delay lets the runtime
//! auto-advance to the timer, fire it and drain the driver before the test
//! continues.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use chrono::Utc;
use common::{TestApp, BUYER, LENDER, SELLER};
use marketplace::aggregates::Order;
use marketplace::lifecycle::{JobState, LifecycleStep, ScheduledJob, DEFAULT_STEP_DELAY};
use marketplace::notifications::{Notification, NotificationKind, Push};
use marketplace::store::{JobStore, OrderRepository};
use marketplace::types::{AccountId, Money, OrderId, OrderStatus, PaymentStatus, Role};
use serde_json::json;
use std::time::Duration;
use tokio::sync::broadcast::{error::TryRecvError, Receiver};

const STEP: Duration = Duration::from_secs(DEFAULT_STEP_DELAY.as_secs() + 1);

async fn order(app: &TestApp, id: &str) -> Order {
    let id: OrderId = id.parse().unwrap();
    OrderRepository::get(app.store.as_ref(), id).await.unwrap().unwrap()
}

/// Next pushed notification, which must already be waiting.
fn pushed(rx: &mut Receiver<Push>) -> Notification {
    match rx.try_recv() {
        Ok(Push::Notification(notification)) => *notification,
        other => panic!("expected a pushed notification, got {other:?}"),
    }
}

async fn accept(app: &TestApp, order_id: &str) {
    let (status, body) = app
        .post(
            "/api/orders/seller-action",
            Some(&app.seller()),
            &json!({ "orderId": order_id, "action": "accept" }),
        )
        .await;
    assert!(status.is_success(), "{body}");
}

#[tokio::test(start_paused = true)]
async fn test_accepted_order_is_dispatched_then_delivered() {
    let app = TestApp::new().await;
    let order_id = app.buy().await;
    accept(&app, &order_id).await;

    let mut seller_rx = app.hub.join(format!("seller_{SELLER}")).await;
    let mut buyer_rx = app.hub.join(format!("buyer_{BUYER}")).await;

    // Nothing happens before the first delay.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(order(&app, &order_id).await.status, OrderStatus::Accepted);
    assert_eq!(buyer_rx.try_recv(), Err(TryRecvError::Empty));

    // T+5m: out for delivery and paid.
    tokio::time::sleep(STEP).await;
    let dispatched = order(&app, &order_id).await;
    assert_eq!(dispatched.status, OrderStatus::OutForDelivery);
    assert_eq!(dispatched.payment_status, PaymentStatus::Paid);

    let seller_inbox = app.inbox(SELLER, Role::Seller).await;
    assert_eq!(seller_inbox.len(), 2);
    assert_eq!(seller_inbox[0].kind, NotificationKind::Payment);
    assert_eq!(seller_inbox[0].title, "Payment Received");
    assert_eq!(pushed(&mut seller_rx), seller_inbox[0]);
    assert_eq!(seller_rx.try_recv(), Err(TryRecvError::Empty));

    let buyer_inbox = app.inbox(BUYER, Role::Buyer).await;
    assert_eq!(buyer_inbox.len(), 2);
    assert!(buyer_inbox[0].message.contains("out for delivery"));
    assert_eq!(pushed(&mut buyer_rx), buyer_inbox[0]);
    assert_eq!(buyer_rx.try_recv(), Err(TryRecvError::Empty));

    // T+10m: delivered, one more buyer notification.
    tokio::time::sleep(STEP).await;
    assert_eq!(order(&app, &order_id).await.status, OrderStatus::Delivered);

    let buyer_inbox = app.inbox(BUYER, Role::Buyer).await;
    assert_eq!(buyer_inbox.len(), 3);
    assert_eq!(buyer_inbox[0].title, "Order Delivered");
    assert_eq!(pushed(&mut buyer_rx), buyer_inbox[0]);
    assert_eq!(seller_rx.try_recv(), Err(TryRecvError::Empty));

    assert!(JobStore::pending(app.store.as_ref()).await.unwrap().is_empty());
    assert_eq!(app.services.scheduler.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_declined_order_never_moves() {
    let app = TestApp::new().await;
    let order_id = app.buy().await;
    let (status, _) = app
        .post(
            "/api/orders/seller-action",
            Some(&app.seller()),
            &json!({ "orderId": order_id, "action": "decline" }),
        )
        .await;
    assert!(status.is_success());

    tokio::time::sleep(STEP * 3).await;
    assert_eq!(order(&app, &order_id).await.status, OrderStatus::Cancelled);
    assert!(JobStore::pending(app.store.as_ref()).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stale_step_aborts_without_touching_order() {
    let app = TestApp::new().await;
    let order_id = app.buy().await;
    accept(&app, &order_id).await;

    let jobs = JobStore::pending(app.store.as_ref()).await.unwrap();
    assert_eq!(jobs.len(), 1);
    let job_id = jobs[0].id;

    // Someone else moves the order while the timer is armed.
    let mut diverged = order(&app, &order_id).await;
    diverged.status = OrderStatus::Cancelled;
    app.store.update(diverged, OrderStatus::Accepted).await.unwrap();

    tokio::time::sleep(STEP).await;

    let after = order(&app, &order_id).await;
    assert_eq!(after.status, OrderStatus::Cancelled);
    assert_eq!(after.payment_status, PaymentStatus::Unpaid);
    let job = JobStore::get(app.store.as_ref(), job_id).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Aborted);

    // No payment, no dispatch notification.
    assert_eq!(app.inbox(SELLER, Role::Seller).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rental_is_delivered_without_lender_answer() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/rent-orders/rent",
            Some(&app.buyer()),
            &json!({ "bookId": app.lend_book.id, "durationWeeks": 2 }),
        )
        .await;
    assert_eq!(status.as_u16(), 201, "{body}");
    assert_eq!(body["order"]["status"], "accepted");
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    // T+5m: out for delivery, lender paid.
    tokio::time::sleep(STEP).await;
    let dispatched = order(&app, &order_id).await;
    assert_eq!(dispatched.status, OrderStatus::OutForDelivery);
    assert_eq!(dispatched.payment_status, PaymentStatus::Paid);
    let lender_inbox = app.inbox(LENDER, Role::Lender).await;
    assert_eq!(lender_inbox[0].title, "Payment Received");

    // T+10m: delivered.
    tokio::time::sleep(STEP).await;
    assert_eq!(order(&app, &order_id).await.status, OrderStatus::Delivered);
    let titles: Vec<String> = app
        .inbox(BUYER, Role::Buyer)
        .await
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert_eq!(titles, vec!["Delivery Completed", "Order Update", "Rental Order Placed"]);
    assert!(JobStore::pending(app.store.as_ref()).await.unwrap().is_empty());

    let (_, body) = app
        .get("/api/rent-orders/lender/analytics", Some(&app.lender()))
        .await;
    let months = body["revenueData"].as_array().unwrap();
    assert_eq!(months.len(), 6);
    assert_eq!(months[5]["revenue"], 100);

    // Delivered rentals can be closed by their lender.
    let (status, body) = app
        .post(
            "/api/rent-orders/mark-returned",
            Some(&app.lender()),
            &json!({ "orderId": order_id }),
        )
        .await;
    assert!(status.is_success(), "{body}");
    assert_eq!(body["order"]["status"], "returned");
    assert!(app
        .inbox(BUYER, Role::Buyer)
        .await
        .iter()
        .any(|n| n.message.contains("marked as returned")));
    assert!(!app.inbox(LENDER, Role::Lender).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_recovery_rearms_pending_jobs() {
    let app = TestApp::new().await;
    let now = Utc::now();

    // An accepted order whose dispatch was armed by a previous process.
    let mut stored = Order::purchase(&app.book, AccountId::new(BUYER), now);
    stored.status = OrderStatus::Accepted;
    let order_id = stored.id;
    OrderRepository::insert(app.store.as_ref(), stored).await.unwrap();
    let job = ScheduledJob::pending(order_id, LifecycleStep::Dispatch, now, Duration::from_secs(120));
    let job_id = job.id;
    JobStore::insert(app.store.as_ref(), job).await.unwrap();

    assert_eq!(app.services.scheduler.recover().await.unwrap(), 1);
    assert_eq!(app.services.scheduler.pending_timers(), 1);

    tokio::time::sleep(Duration::from_secs(121)).await;
    let recovered = order(&app, &order_id.to_string()).await;
    assert_eq!(recovered.status, OrderStatus::OutForDelivery);
    assert_eq!(recovered.amount, Money::from_rupees(300));
    let job = JobStore::get(app.store.as_ref(), job_id).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Completed);

    // The chain continues from the recovered step.
    tokio::time::sleep(STEP).await;
    assert_eq!(
        order(&app, &order_id.to_string()).await.status,
        OrderStatus::Delivered
    );
}

#[tokio::test(start_paused = true)]
async fn test_overdue_job_fires_immediately_on_recovery() {
    let app = TestApp::new().await;
    let long_ago = Utc::now() - chrono::Duration::hours(1);

    let mut stored = Order::purchase(&app.book, AccountId::new(BUYER), long_ago);
    stored.status = OrderStatus::Accepted;
    let order_id = stored.id;
    OrderRepository::insert(app.store.as_ref(), stored).await.unwrap();
    JobStore::insert(
        app.store.as_ref(),
        ScheduledJob::pending(order_id, LifecycleStep::Dispatch, long_ago, DEFAULT_STEP_DELAY),
    )
    .await
    .unwrap();

    app.services.scheduler.recover().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(
        order(&app, &order_id.to_string()).await.status,
        OrderStatus::OutForDelivery
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_leaves_jobs_for_next_start() {
    let app = TestApp::new().await;
    let order_id = app.buy().await;
    accept(&app, &order_id).await;

    let result = app.services.shutdown(Duration::from_secs(1)).await;
    assert!(matches!(
        result,
        Err(librix_runtime::RunnerError::TimersAbandoned(1))
    ));
    assert!(!app.services.scheduler.is_accepting());

    tokio::time::sleep(STEP).await;
    assert_eq!(order(&app, &order_id).await.status, OrderStatus::Accepted);
    assert_eq!(JobStore::pending(app.store.as_ref()).await.unwrap().len(), 1);
}
