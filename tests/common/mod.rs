#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use orderdesk_api::{
    app_router,
    config::AppConfig,
    db,
    entities::{customer, product},
    events::{self, EventSender},
    services::{
        catalog::CreateProductRequest, customers::CreateCustomerRequest, CreateOrderOutcome,
        CreateOrderRequest, OrderLineRequest, OrderService,
    },
    AppState,
};

/// Helper harness for spinning up an application state backed by a throwaway SQLite file.
///
/// The pool holds a single connection, so concurrent transactions queue up the
/// same way row locks make them queue on Postgres.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_file = dir.path().join("orderdesk_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(db_arc, cfg, Some(event_sender));
        let router = app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _dir: dir,
        }
    }

    /// Send a request against the router and decode the JSON body (Null when empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub fn order_service(&self) -> Arc<OrderService> {
        self.state.services.order.clone()
    }

    pub async fn seed_customer(&self) -> customer::Model {
        let tag = Uuid::new_v4().simple().to_string();
        self.state
            .services
            .customer
            .create_customer(CreateCustomerRequest {
                name: format!("Customer {}", &tag[..8]),
                document: unique_cpf(),
                email: format!("customer-{}@example.com", tag),
                phone: String::new(),
                address: String::new(),
            })
            .await
            .expect("seed customer for tests")
    }

    pub async fn seed_product(&self, price: Decimal, stock: i32) -> product::Model {
        let tag = Uuid::new_v4().simple().to_string();
        self.state
            .services
            .catalog
            .create_product(CreateProductRequest {
                sku: format!("SKU-{}", &tag[..12]),
                name: format!("Product {}", &tag[..8]),
                description: String::new(),
                price,
                stock_quantity: stock,
                is_active: true,
            })
            .await
            .expect("seed product for tests")
    }

    /// Current stock of a product, soft-deleted rows included.
    pub async fn stock_of(&self, product_id: Uuid) -> i32 {
        use sea_orm::EntityTrait;

        product::Entity::find_by_id(product_id)
            .one(&*self.state.db)
            .await
            .expect("stock lookup")
            .expect("product exists")
            .stock_quantity
    }

    pub async fn order_count(&self) -> u64 {
        use sea_orm::{EntityTrait, PaginatorTrait};

        orderdesk_api::entities::order::Entity::find()
            .count(&*self.state.db)
            .await
            .expect("order count")
    }

    pub async fn place_order(
        &self,
        customer_id: Uuid,
        key: &str,
        lines: &[(Uuid, i32)],
    ) -> Result<CreateOrderOutcome, orderdesk_api::errors::ServiceError> {
        self.order_service()
            .create_order(order_request(customer_id, key, lines))
            .await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn order_request(customer_id: Uuid, key: &str, lines: &[(Uuid, i32)]) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_id,
        idempotency_key: key.to_string(),
        items: lines
            .iter()
            .map(|&(product_id, quantity)| OrderLineRequest {
                product_id,
                quantity,
            })
            .collect(),
        observations: None,
    }
}

/// Reads a decimal rendered as a JSON string or number.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}

/// A random CPF with valid check digits.
pub fn unique_cpf() -> String {
    loop {
        let seed = Uuid::new_v4().as_u128();
        let mut digits: Vec<u32> = (0..9).map(|i| ((seed >> (i * 4)) % 10) as u32).collect();
        if digits.iter().all(|d| *d == digits[0]) {
            continue;
        }

        for len in [9usize, 10] {
            let sum: u32 = digits
                .iter()
                .enumerate()
                .map(|(i, d)| d * (len as u32 + 1 - i as u32))
                .sum();
            let check = (sum * 10) % 11;
            digits.push(if check == 10 { 0 } else { check });
        }

        return digits.iter().map(|d| char::from_digit(*d, 10).unwrap_or('0')).collect();
    }
}
