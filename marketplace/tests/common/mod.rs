//! Shared harness for the marketplace integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use librix_core::environment::Clock;
use librix_web::RoomHub;
use marketplace::aggregates::{Book, LendBook};
use marketplace::app::{InMemoryImageStore, Services};
use marketplace::auth::TokenKeys;
use marketplace::lifecycle::LifecycleTimings;
use marketplace::notifications::{Push, RoomFanOut};
use marketplace::server::{build_router, AppState};
use marketplace::store::{Catalog, InMemoryStore, Repositories};
use marketplace::types::{AccountId, BookId, LendBookId, Money, Role};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const SELLER: &str = "seller-1";
pub const OTHER_SELLER: &str = "seller-2";
pub const LENDER: &str = "lender-1";
pub const BUYER: &str = "buyer-1";

/// A running marketplace with one book for sale and one for rent.
pub struct TestApp {
    pub router: Router,
    pub services: Arc<Services>,
    pub store: Arc<InMemoryStore>,
    pub hub: RoomHub<Push>,
    pub keys: Arc<TokenKeys>,
    pub book: Book,
    pub lend_book: LendBook,
}

impl TestApp {
    /// Default five-minute timings and the wall clock.
    pub async fn new() -> Self {
        Self::with(
            LifecycleTimings::default(),
            Arc::new(librix_core::environment::SystemClock),
        )
        .await
    }

    pub async fn with(timings: LifecycleTimings, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let book = Book {
            id: BookId::new(),
            title: "Godan".to_string(),
            seller: AccountId::new(SELLER),
            price: Money::from_rupees(300),
        };
        let lend_book = LendBook {
            id: LendBookId::new(),
            title: "Malgudi Days".to_string(),
            lender: AccountId::new(LENDER),
            rent_price_per_week: Money::from_rupees(50),
        };
        store.add_book(book.clone()).await.unwrap();
        store.add_lend_book(lend_book.clone()).await.unwrap();

        let hub = RoomHub::new();
        let services = Arc::new(Services::start(
            Repositories::from_store(&store),
            Arc::new(RoomFanOut::new(hub.clone())),
            clock,
            timings,
            Arc::new(InMemoryImageStore::new()),
        ));
        let keys = Arc::new(TokenKeys::new(
            "buyer-test-secret",
            "seller-test-secret",
            "lender-test-secret",
            Duration::from_secs(3600),
        ));
        let router = build_router(AppState::new(
            services.clone(),
            keys.clone(),
            hub.clone(),
            std::env::temp_dir(),
        ));

        Self {
            router,
            services,
            store,
            hub,
            keys,
            book,
            lend_book,
        }
    }

    pub fn token(&self, account: &str, role: Role) -> String {
        self.keys.issue(&AccountId::new(account), role).unwrap()
    }

    pub fn buyer(&self) -> String {
        self.token(BUYER, Role::Buyer)
    }

    pub fn seller(&self) -> String {
        self.token(SELLER, Role::Seller)
    }

    pub fn lender(&self) -> String {
        self.token(LENDER, Role::Lender)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: &Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    /// Place a purchase of the seeded book and return the order id.
    pub async fn buy(&self) -> String {
        let (status, body) = self
            .post(
                "/api/orders/buy",
                Some(&self.buyer()),
                &serde_json::json!({ "bookId": self.book.id }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["order"]["id"].as_str().unwrap().to_string()
    }

    /// Notifications of `account` in `role`, newest first.
    pub async fn inbox(&self, account: &str, role: Role) -> Vec<marketplace::notifications::Notification> {
        self.services
            .notifications(&AccountId::new(account), role)
            .await
            .unwrap()
    }
}
