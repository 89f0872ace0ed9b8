mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::{decimal, TestApp};

#[tokio::test]
async fn create_returns_201_then_200_on_replay() {
    let app = TestApp::new().await;
    let customer = app.seed_customer().await;
    let product = app.seed_product(dec!(4500.00), 20).await;

    let payload = json!({
        "customer_id": customer.id,
        "idempotency_key": "api-1",
        "items": [{ "product_id": product.id, "quantity": 2 }],
        "observations": "leave at the door"
    });

    let (status, body) = app
        .request(Method::POST, "/api/v1/orders", Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let order = &body["data"];
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["customer_name"], customer.name.as_str());
    assert_eq!(order["observations"], "leave at the door");
    assert_eq!(decimal(&order["total_amount"]), dec!(9000.00));

    let (status, replay) = app
        .request(Method::POST, "/api/v1/orders", Some(payload))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["data"]["id"], order["id"]);
    assert_eq!(replay["data"]["order_number"], order["order_number"]);

    assert_eq!(app.stock_of(product.id).await, 18);
}

#[tokio::test]
async fn business_rule_failures_are_400() {
    let app = TestApp::new().await;
    let customer = app.seed_customer().await;
    let product = app.seed_product(dec!(10.00), 1).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": Uuid::new_v4(),
                "idempotency_key": "bad-1",
                "items": [{ "product_id": product.id, "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_customer");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer.id,
                "idempotency_key": "bad-2",
                "items": []
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "empty_order");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer.id,
                "idempotency_key": "bad-3",
                "items": [{ "product_id": product.id, "quantity": 2 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "insufficient_stock");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer.id,
                "idempotency_key": "bad-4",
                "items": [{ "product_id": Uuid::new_v4(), "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.order_count().await, 0);
}

#[tokio::test]
async fn reads_items_and_history() {
    let app = TestApp::new().await;
    let customer = app.seed_customer().await;
    let product = app.seed_product(dec!(12.50), 10).await;
    let order = app
        .place_order(customer.id, "read-1", &[(product.id, 3)])
        .await
        .expect("order")
        .order;

    let (status, body) = app
        .request(Method::GET, &format!("/api/v1/orders/{}", order.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order_number"], order.order_number.as_str());

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}/items", order.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_name"], product.name.as_str());
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(decimal(&items[0]["subtotal"]), dec!(37.50));

    let (status, body) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/orders/{}/status", order.id),
            Some(json!({ "new_status": "confirmed", "reason": "paid" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "CONFIRMED");

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}/status-history", order.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().expect("history array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["previous_status"], "PENDING");
    assert_eq!(rows[0]["new_status"], "CONFIRMED");
    assert_eq!(rows[0]["changed_by"], "System");
    assert_eq!(rows[0]["reason"], "paid");
}

#[tokio::test]
async fn unknown_orders_are_404_everywhere() {
    let app = TestApp::new().await;
    let missing = Uuid::new_v4();

    for uri in [
        format!("/api/v1/orders/{missing}"),
        format!("/api/v1/orders/{missing}/items"),
        format!("/api/v1/orders/{missing}/status-history"),
    ] {
        let (status, body) = app.request(Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["code"], "not_found");
    }

    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/orders/{missing}/status"),
            Some(json!({ "new_status": "CONFIRMED" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/v1/orders/{missing}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn illegal_or_unknown_status_is_400() {
    let app = TestApp::new().await;
    let customer = app.seed_customer().await;
    let product = app.seed_product(dec!(1.00), 5).await;
    let order = app
        .place_order(customer.id, "patch-1", &[(product.id, 1)])
        .await
        .expect("order")
        .order;
    let uri = format!("/api/v1/orders/{}/status", order.id);

    let (status, body) = app
        .request(
            Method::PATCH,
            &uri,
            Some(json!({ "new_status": "SHIPPED", "changed_by": "ops" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_transition");

    let (status, body) = app
        .request(Method::PATCH, &uri, Some(json!({ "new_status": "LOST" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn delete_cancels_with_204_and_restores_stock() {
    let app = TestApp::new().await;
    let customer = app.seed_customer().await;
    let product = app.seed_product(dec!(7.25), 8).await;
    let order = app
        .place_order(customer.id, "del-1", &[(product.id, 2)])
        .await
        .expect("order")
        .order;
    assert_eq!(app.stock_of(product.id).await, 6);

    let (status, body) = app
        .request(Method::DELETE, &format!("/api/v1/orders/{}", order.id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, serde_json::Value::Null);
    assert_eq!(app.stock_of(product.id).await, 8);

    let (status, body) = app
        .request(Method::GET, &format!("/api/v1/orders/{}", order.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "CANCELED");

    let (status, body) = app
        .request(Method::DELETE, &format!("/api/v1/orders/{}", order.id), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "not_cancelable");
    assert_eq!(app.stock_of(product.id).await, 8);
}

#[tokio::test]
async fn list_filters_by_customer_and_status() {
    let app = TestApp::new().await;
    let alice = app.seed_customer().await;
    let bob = app.seed_customer().await;
    let product = app.seed_product(dec!(1.00), 50).await;

    let a1 = app
        .place_order(alice.id, "list-a1", &[(product.id, 1)])
        .await
        .expect("a1")
        .order;
    app.place_order(alice.id, "list-a2", &[(product.id, 1)])
        .await
        .expect("a2");
    app.place_order(bob.id, "list-b1", &[(product.id, 1)])
        .await
        .expect("b1");

    app.state
        .services
        .order_status
        .transition(a1.id, orderdesk_api::entities::OrderStatus::Confirmed, "ops", None)
        .await
        .expect("confirm");

    let (status, body) = app.request(Method::GET, "/api/v1/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(3));

    let (_, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders?customer_id={}", alice.id),
            None,
        )
        .await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders?customer={}", bob.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let bobs = body["data"].as_array().expect("array");
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0]["customer_id"], bob.id.to_string());

    let (_, body) = app
        .request(Method::GET, "/api/v1/orders?status=confirmed", None)
        .await;
    let confirmed = body["data"].as_array().expect("array");
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0]["id"], a1.id.to_string());

    let fragment = a1.order_number[4..10].to_lowercase();
    let (_, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders?order_number={fragment}"),
            None,
        )
        .await;
    let matches = body["data"].as_array().expect("array");
    assert!(matches.iter().any(|o| o["id"] == a1.id.to_string()));
}

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"]["status"], "up");
}
