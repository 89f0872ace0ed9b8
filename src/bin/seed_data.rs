//! Seed data script - populates the database with a small demo data set
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates, unless already present:
//! - 1 customer
//! - 2 products with stock
//! - 1 order reserving stock from both products
//!
//! Everything goes through the regular services, so running it twice is a no-op.

use anyhow::Context;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::info;

use orderdesk_api::{
    config, db,
    entities::product::Model as ProductModel,
    services::{
        catalog::CreateProductRequest, customers::CreateCustomerRequest, CatalogService,
        CreateOrderRequest, CustomerService, OrderLineRequest, OrderService,
    },
};

const SEED_DOCUMENT: &str = "65998838009";
const SEED_ORDER_KEY: &str = "seed-order-001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!("=== OrderDesk Seed Data ===");

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    db::run_migrations(&pool).await?;
    let pool = Arc::new(pool);

    let customers = CustomerService::new(pool.clone());
    let catalog = CatalogService::new(pool.clone(), None);
    let orders = OrderService::new(pool.clone(), None);

    let customer = match customers.find_by_document(SEED_DOCUMENT).await? {
        Some(existing) => {
            info!(customer_id = %existing.id, "Seed customer already present");
            existing
        }
        None => {
            let created = customers
                .create_customer(CreateCustomerRequest {
                    name: "Maria Souza".to_string(),
                    document: SEED_DOCUMENT.to_string(),
                    email: "maria.souza@example.com".to_string(),
                    phone: "+55 11 98888-7777".to_string(),
                    address: "Rua das Flores, 100, São Paulo - SP".to_string(),
                })
                .await?;
            info!(customer_id = %created.id, "Created seed customer");
            created
        }
    };

    let notebook = ensure_product(
        &catalog,
        CreateProductRequest {
            sku: "SEED-NB-001".to_string(),
            name: "Notebook Pro 14".to_string(),
            description: "14-inch notebook, 16 GB RAM".to_string(),
            price: dec!(4500.00),
            stock_quantity: 20,
            is_active: true,
        },
    )
    .await?;

    let mouse = ensure_product(
        &catalog,
        CreateProductRequest {
            sku: "SEED-MS-001".to_string(),
            name: "Wireless Mouse".to_string(),
            description: "Ergonomic wireless mouse".to_string(),
            price: dec!(150.00),
            stock_quantity: 50,
            is_active: true,
        },
    )
    .await?;

    let outcome = orders
        .create_order(CreateOrderRequest {
            customer_id: customer.id,
            idempotency_key: SEED_ORDER_KEY.to_string(),
            items: vec![
                OrderLineRequest {
                    product_id: notebook.id,
                    quantity: 1,
                },
                OrderLineRequest {
                    product_id: mouse.id,
                    quantity: 2,
                },
            ],
            observations: Some("Seed order".to_string()),
        })
        .await?;

    info!(
        order_id = %outcome.order.id,
        order_number = %outcome.order.order_number,
        total_amount = %outcome.order.total_amount,
        replayed = outcome.replayed,
        "Seed order ready"
    );

    info!("=== Seed Data Complete ===");
    info!("Try these API calls:");
    info!("  curl http://{}/api/v1/orders", cfg.bind_address());
    info!("  curl http://{}/api/v1/products", cfg.bind_address());

    Ok(())
}

async fn ensure_product(
    catalog: &CatalogService,
    request: CreateProductRequest,
) -> anyhow::Result<ProductModel> {
    if let Some(existing) = catalog.find_by_sku(&request.sku).await? {
        info!(sku = %existing.sku, "Seed product already present");
        return Ok(existing);
    }

    let created = catalog.create_product(request).await?;
    info!(sku = %created.sku, product_id = %created.id, "Created seed product");
    Ok(created)
}
