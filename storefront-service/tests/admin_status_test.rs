mod common;

use common::TestApp;
use serde_json::json;
use storefront_service::models::{OrderStatus, Role, StatusHistoryEntry};

#[tokio::test]
async fn admin_updates_status_and_history_gets_default_note() {
    let app = TestApp::spawn().await;
    let admin = app.seed_user(Role::Admin).await;
    let customer = app.seed_user(Role::User).await;
    let product = app.seed_product("Lamp", 45.0, 5).await;
    let order = app
        .seed_order(&customer, &[(&product, 1)], OrderStatus::Processing)
        .await;

    let response = app
        .client
        .patch(format!("{}/admin/orders/{}/status", app.address, order.id))
        .header("cookie", app.cookie_for(&admin))
        .json(&json!({ "status": "SHIPPED" }))
        .send()
        .await
        .expect("Failed to send status update");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Order status updated");

    let data = &body["data"];
    assert_eq!(data["status"], "SHIPPED");

    let history = data["statusHistory"].as_array().expect("history missing");
    let last = history.last().expect("history empty");
    assert_eq!(last["status"], "SHIPPED");
    assert_eq!(last["note"], "Status changed to SHIPPED");

    assert_eq!(app.order_status(order.id).await, OrderStatus::Shipped);

    app.cleanup().await;
}

#[tokio::test]
async fn admin_notes_are_persisted_and_used_as_history_note() {
    let app = TestApp::spawn().await;
    let admin = app.seed_user(Role::Admin).await;
    let customer = app.seed_user(Role::User).await;
    let product = app.seed_product("Desk", 200.0, 2).await;
    let order = app
        .seed_order(&customer, &[(&product, 1)], OrderStatus::Pending)
        .await;

    let response = app
        .client
        .patch(format!("{}/admin/orders/{}/status", app.address, order.id))
        .header("cookie", app.cookie_for(&admin))
        .json(&json!({
            "status": "PROCESSING",
            "adminNotes": "Payment verified by phone"
        }))
        .send()
        .await
        .expect("Failed to send status update");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    let data = &body["data"];
    assert_eq!(data["adminNotes"], "Payment verified by phone");

    let history = data["statusHistory"].as_array().expect("history missing");
    let last = history.last().expect("history empty");
    assert_eq!(last["note"], "Payment verified by phone");

    app.cleanup().await;
}

#[tokio::test]
async fn unknown_and_non_admin_statuses_are_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.seed_user(Role::Admin).await;
    let customer = app.seed_user(Role::User).await;
    let product = app.seed_product("Chair", 60.0, 4).await;
    let order = app
        .seed_order(&customer, &[(&product, 1)], OrderStatus::Pending)
        .await;

    // RETURNED exists as a stored status but is not admin-settable.
    for status in ["RETURNED", "COMPLETED", "shipped", "BOGUS"] {
        let response = app
            .client
            .patch(format!("{}/admin/orders/{}/status", app.address, order.id))
            .header("cookie", app.cookie_for(&admin))
            .json(&json!({ "status": status }))
            .send()
            .await
            .expect("Failed to send status update");
        assert_eq!(response.status(), 400, "status {} should be rejected", status);

        let body: serde_json::Value = response.json().await.expect("Invalid JSON");
        assert!(body["message"]
            .as_str()
            .unwrap_or("")
            .contains("Invalid order status"));
    }

    assert_eq!(app.order_status(order.id).await, OrderStatus::Pending);

    app.cleanup().await;
}

#[tokio::test]
async fn updating_unknown_order_is_not_found() {
    let app = TestApp::spawn().await;
    let admin = app.seed_user(Role::Admin).await;

    let response = app
        .client
        .patch(format!(
            "{}/admin/orders/{}/status",
            app.address,
            uuid::Uuid::new_v4()
        ))
        .header("cookie", app.cookie_for(&admin))
        .json(&json!({ "status": "SHIPPED" }))
        .send()
        .await
        .expect("Failed to send status update");
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn cancelled_order_is_immutable_except_for_re_cancel() {
    let app = TestApp::spawn().await;
    let admin = app.seed_user(Role::Admin).await;
    let customer = app.seed_user(Role::User).await;
    let product = app.seed_product("Table", 120.0, 3).await;
    let order = app
        .seed_order(&customer, &[(&product, 1)], OrderStatus::Cancelled)
        .await;

    let url = format!("{}/admin/orders/{}/status", app.address, order.id);
    let cookie = app.cookie_for(&admin);

    let forward = app
        .client
        .patch(&url)
        .header("cookie", &cookie)
        .json(&json!({ "status": "SHIPPED" }))
        .send()
        .await
        .expect("Failed to send status update");
    assert_eq!(forward.status(), 400);

    let body: serde_json::Value = forward.json().await.expect("Invalid JSON");
    assert_eq!(body["message"], "Cannot update a cancelled order");

    // Setting CANCELLED again is an idempotent no-op transition.
    let re_cancel = app
        .client
        .patch(&url)
        .header("cookie", &cookie)
        .json(&json!({ "status": "CANCELLED" }))
        .send()
        .await
        .expect("Failed to send status update");
    assert_eq!(re_cancel.status(), 200);
    assert_eq!(app.order_status(order.id).await, OrderStatus::Cancelled);

    app.cleanup().await;
}

#[tokio::test]
async fn status_write_refuses_an_order_cancelled_after_the_read() {
    let app = TestApp::spawn().await;
    let customer = app.seed_user(Role::User).await;
    let product = app.seed_product("Bench", 75.0, 4).await;
    // The order flips to CANCELLED after an admin would have read it as
    // PENDING; the write must see the current status, not the stale read.
    let order = app
        .seed_order(&customer, &[(&product, 1)], OrderStatus::Cancelled)
        .await;

    let entry = StatusHistoryEntry {
        status: OrderStatus::Shipped,
        note: "Status changed to SHIPPED".to_string(),
        timestamp: mongodb::bson::DateTime::now(),
    };
    let matched = app
        .repository
        .update_order_status(order.id, OrderStatus::Shipped, None, &entry)
        .await
        .expect("Failed to run status update");
    assert!(!matched, "cancelled order must not match a forward transition");
    assert_eq!(app.order_status(order.id).await, OrderStatus::Cancelled);

    // Re-cancelling still matches; that path stays idempotent.
    let entry = StatusHistoryEntry {
        status: OrderStatus::Cancelled,
        note: "Status changed to CANCELLED".to_string(),
        timestamp: mongodb::bson::DateTime::now(),
    };
    let matched = app
        .repository
        .update_order_status(order.id, OrderStatus::Cancelled, None, &entry)
        .await
        .expect("Failed to run status update");
    assert!(matched);

    app.cleanup().await;
}

#[tokio::test]
async fn admin_cancel_does_not_restore_inventory() {
    let app = TestApp::spawn().await;
    let admin = app.seed_user(Role::Admin).await;
    let customer = app.seed_user(Role::User).await;
    let product = app.seed_product("Rug", 95.0, 9).await;
    let order = app
        .seed_order(&customer, &[(&product, 2)], OrderStatus::Pending)
        .await;

    let response = app
        .client
        .patch(format!("{}/admin/orders/{}/status", app.address, order.id))
        .header("cookie", app.cookie_for(&admin))
        .json(&json!({ "status": "CANCELLED" }))
        .send()
        .await
        .expect("Failed to send status update");
    assert_eq!(response.status(), 200);

    // The admin transition is a pure status change. Inventory restoration
    // and the audit record belong to the customer cancellation flow only.
    assert_eq!(app.order_status(order.id).await, OrderStatus::Cancelled);
    assert_eq!(app.product_inventory(product.id).await, 9);
    assert_eq!(app.cancellation_count(order.id).await, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn non_admin_cannot_update_status() {
    let app = TestApp::spawn().await;
    let customer = app.seed_user(Role::User).await;
    let product = app.seed_product("Vase", 30.0, 6).await;
    let order = app
        .seed_order(&customer, &[(&product, 1)], OrderStatus::Pending)
        .await;

    let response = app
        .client
        .patch(format!("{}/admin/orders/{}/status", app.address, order.id))
        .header("cookie", app.cookie_for(&customer))
        .json(&json!({ "status": "SHIPPED" }))
        .send()
        .await
        .expect("Failed to send status update");
    assert_eq!(response.status(), 403);

    assert_eq!(app.order_status(order.id).await, OrderStatus::Pending);

    app.cleanup().await;
}
