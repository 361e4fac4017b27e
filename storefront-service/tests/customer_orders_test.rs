mod common;

use common::TestApp;
use storefront_service::models::{OrderStatus, Role};

#[tokio::test]
async fn customer_sees_only_their_own_orders() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user(Role::User).await;
    let bob = app.seed_user(Role::User).await;
    let product = app.seed_product("Shirt", 25.0, 10).await;
    let alice_order = app
        .seed_order(&alice, &[(&product, 1)], OrderStatus::Pending)
        .await;
    app.seed_order(&bob, &[(&product, 1)], OrderStatus::Pending)
        .await;

    let response = app
        .client
        .get(format!("{}/orders", app.address))
        .header("cookie", app.cookie_for(&alice))
        .send()
        .await
        .expect("Failed to list orders");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    let orders = body["data"].as_array().expect("orders missing");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], alice_order.id.to_string());
    // Customer views never embed the customer summary.
    assert!(orders[0].get("customer").is_none());

    app.cleanup().await;
}

#[tokio::test]
async fn order_detail_is_owner_only() {
    let app = TestApp::spawn().await;
    let owner = app.seed_user(Role::User).await;
    let intruder = app.seed_user(Role::User).await;
    let product = app.seed_product("Cap", 12.0, 10).await;
    let order = app
        .seed_order(&owner, &[(&product, 2)], OrderStatus::Processing)
        .await;

    let mine = app
        .client
        .get(format!("{}/orders/{}", app.address, order.id))
        .header("cookie", app.cookie_for(&owner))
        .send()
        .await
        .expect("Failed to fetch order");
    assert_eq!(mine.status(), 200);

    let body: serde_json::Value = mine.json().await.expect("Invalid JSON");
    assert_eq!(body["data"]["status"], "PROCESSING");
    assert_eq!(body["data"]["totalAmount"], 24.0);

    let theirs = app
        .client
        .get(format!("{}/orders/{}", app.address, order.id))
        .header("cookie", app.cookie_for(&intruder))
        .send()
        .await
        .expect("Failed to fetch order");
    assert_eq!(theirs.status(), 403);

    app.cleanup().await;
}
