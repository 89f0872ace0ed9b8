mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::{decimal, TestApp};

#[tokio::test]
async fn create_get_and_conflicting_sku() {
    let app = TestApp::new().await;
    let payload = json!({
        "sku": "NB-001",
        "name": "Notebook",
        "description": "14 inch",
        "price": "4500.00",
        "stock_quantity": 20
    });

    let (status, body) = app
        .request(Method::POST, "/api/v1/products", Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let product = &body["data"];
    assert_eq!(product["sku"], "NB-001");
    assert_eq!(product["is_active"], true);
    assert_eq!(product["stock_quantity"], 20);
    assert_eq!(decimal(&product["price"]), dec!(4500.00));

    let id = product["id"].as_str().expect("id");
    let (status, body) = app
        .request(Method::GET, &format!("/api/v1/products/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Notebook");

    let (status, body) = app
        .request(Method::POST, "/api/v1/products", Some(payload))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn invalid_price_or_stock_is_400() {
    let app = TestApp::new().await;

    for payload in [
        json!({ "sku": "P-1", "name": "A", "price": "-1.00", "stock_quantity": 1 }),
        json!({ "sku": "P-2", "name": "B", "price": "1.001", "stock_quantity": 1 }),
        json!({ "sku": "P-3", "name": "C", "price": "1.00", "stock_quantity": -1 }),
        json!({ "sku": "", "name": "D", "price": "1.00", "stock_quantity": 1 }),
        json!({ "sku": "P-5", "name": "E", "price": "10000000000000.00", "stock_quantity": 1 }),
    ] {
        let (status, body) = app
            .request(Method::POST, "/api/v1/products", Some(payload.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body["code"], "validation_error");
    }
}

#[tokio::test]
async fn patch_updates_only_given_fields() {
    let app = TestApp::new().await;
    let product = app.seed_product(dec!(10.00), 4).await;

    let (status, body) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/products/{}", product.id),
            Some(json!({ "price": "12.50", "is_active": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let updated = &body["data"];
    assert_eq!(decimal(&updated["price"]), dec!(12.50));
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["name"], product.name.as_str());
    assert_eq!(updated["stock_quantity"], 4);
}

#[tokio::test]
async fn update_stock_sets_the_absolute_level() {
    let app = TestApp::new().await;
    let product = app.seed_product(dec!(10.00), 4).await;
    let uri = format!("/api/v1/products/{}/update-stock", product.id);

    let (status, body) = app
        .request(Method::PATCH, &uri, Some(json!({ "stock_quantity": 15 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock_quantity"], 15);
    assert_eq!(app.stock_of(product.id).await, 15);

    let (status, _) = app
        .request(Method::PATCH, &uri, Some(json!({ "stock_quantity": -2 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stock_of(product.id).await, 15);

    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/products/{}/update-stock", Uuid::new_v4()),
            Some(json!({ "stock_quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn soft_delete_hides_product_but_keeps_order_items() {
    let app = TestApp::new().await;
    let customer = app.seed_customer().await;
    let product = app.seed_product(dec!(3.00), 10).await;
    let order = app
        .place_order(customer.id, "prod-del-1", &[(product.id, 2)])
        .await
        .expect("order")
        .order;

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/v1/products/{}", product.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request(Method::GET, &format!("/api/v1/products/{}", product.id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.request(Method::GET, "/api/v1/products", None).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}/items", order.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["product_name"], product.name.as_str());
}

#[tokio::test]
async fn list_filters_by_name_and_activity() {
    let app = TestApp::new().await;
    for (sku, name, active) in [
        ("F-1", "Wireless Mouse", true),
        ("F-2", "Wired Mouse", false),
        ("F-3", "Keyboard", true),
    ] {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/v1/products",
                Some(json!({
                    "sku": sku,
                    "name": name,
                    "price": "10.00",
                    "stock_quantity": 1,
                    "is_active": active
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = app
        .request(Method::GET, "/api/v1/products?name_like=Mouse", None)
        .await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let (_, body) = app
        .request(
            Method::GET,
            "/api/v1/products?name_like=Mouse&is_active=true",
            None,
        )
        .await;
    let listed = body["data"].as_array().expect("array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["sku"], "F-1");

    let (_, body) = app
        .request(Method::GET, "/api/v1/products?sku=F-3", None)
        .await;
    assert_eq!(body["data"][0]["name"], "Keyboard");
}
