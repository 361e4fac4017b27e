mod common;

use common::TestApp;
use serde_json::json;
use storefront_service::models::Role;

#[tokio::test]
async fn adding_the_same_variant_twice_merges_quantities() {
    let app = TestApp::spawn().await;
    let user = app.seed_user(Role::User).await;
    let product = app.seed_product("Shirt", 25.0, 10).await;
    let cookie = app.cookie_for(&user);

    for _ in 0..2 {
        let response = app
            .client
            .post(format!("{}/cart/items", app.address))
            .header("cookie", &cookie)
            .json(&json!({
                "productId": product.id,
                "quantity": 2,
                "size": "M"
            }))
            .send()
            .await
            .expect("Failed to add cart item");
        assert_eq!(response.status(), 201);
    }

    // A different size is a separate line.
    let response = app
        .client
        .post(format!("{}/cart/items", app.address))
        .header("cookie", &cookie)
        .json(&json!({
            "productId": product.id,
            "quantity": 1,
            "size": "L"
        }))
        .send()
        .await
        .expect("Failed to add cart item");
    assert_eq!(response.status(), 201);

    let cart = app
        .client
        .get(format!("{}/cart", app.address))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("Failed to fetch cart");
    let body: serde_json::Value = cart.json().await.expect("Invalid JSON");

    let items = body["data"]["items"].as_array().expect("items missing");
    assert_eq!(items.len(), 2);
    let medium = items
        .iter()
        .find(|i| i["size"] == "M")
        .expect("merged line missing");
    assert_eq!(medium["quantity"], 4);
    assert_eq!(body["data"]["subtotal"], 125.0);

    app.cleanup().await;
}

#[tokio::test]
async fn adding_unknown_product_to_cart_is_not_found() {
    let app = TestApp::spawn().await;
    let user = app.seed_user(Role::User).await;

    let response = app
        .client
        .post(format!("{}/cart/items", app.address))
        .header("cookie", app.cookie_for(&user))
        .json(&json!({
            "productId": uuid::Uuid::new_v4(),
            "quantity": 1
        }))
        .send()
        .await
        .expect("Failed to add cart item");
    assert_eq!(response.status(), 404);

    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["message"], "Product not found");

    app.cleanup().await;
}

#[tokio::test]
async fn cart_items_are_owner_scoped() {
    let app = TestApp::spawn().await;
    let owner = app.seed_user(Role::User).await;
    let intruder = app.seed_user(Role::User).await;
    let product = app.seed_product("Cap", 12.0, 10).await;

    app.repository
        .upsert_cart_item(owner.id, product.id, 1, None, None)
        .await
        .expect("Failed to seed cart");
    let item = app
        .repository
        .cart_items_for_user(owner.id)
        .await
        .expect("Failed to read cart")
        .pop()
        .expect("cart line missing");

    let update = app
        .client
        .patch(format!("{}/cart/items/{}", app.address, item.id))
        .header("cookie", app.cookie_for(&intruder))
        .json(&json!({ "quantity": 5 }))
        .send()
        .await
        .expect("Failed to update cart item");
    assert_eq!(update.status(), 403);

    let remove = app
        .client
        .delete(format!("{}/cart/items/{}", app.address, item.id))
        .header("cookie", app.cookie_for(&intruder))
        .send()
        .await
        .expect("Failed to delete cart item");
    assert_eq!(remove.status(), 403);

    // The owner's line is untouched.
    let cart = app
        .repository
        .cart_items_for_user(owner.id)
        .await
        .expect("Failed to read cart");
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 1);

    app.cleanup().await;
}

#[tokio::test]
async fn owner_can_update_and_remove_cart_lines() {
    let app = TestApp::spawn().await;
    let user = app.seed_user(Role::User).await;
    let product = app.seed_product("Belt", 18.0, 10).await;
    let cookie = app.cookie_for(&user);

    app.repository
        .upsert_cart_item(user.id, product.id, 1, None, None)
        .await
        .expect("Failed to seed cart");
    let item = app
        .repository
        .cart_items_for_user(user.id)
        .await
        .expect("Failed to read cart")
        .pop()
        .expect("cart line missing");

    let update = app
        .client
        .patch(format!("{}/cart/items/{}", app.address, item.id))
        .header("cookie", &cookie)
        .json(&json!({ "quantity": 3 }))
        .send()
        .await
        .expect("Failed to update cart item");
    assert_eq!(update.status(), 200);

    let cart = app
        .repository
        .cart_items_for_user(user.id)
        .await
        .expect("Failed to read cart");
    assert_eq!(cart[0].quantity, 3);

    let remove = app
        .client
        .delete(format!("{}/cart/items/{}", app.address, item.id))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("Failed to delete cart item");
    assert_eq!(remove.status(), 200);

    let cart = app
        .repository
        .cart_items_for_user(user.id)
        .await
        .expect("Failed to read cart");
    assert!(cart.is_empty());

    app.cleanup().await;
}

#[tokio::test]
async fn clearing_the_cart_removes_all_lines() {
    let app = TestApp::spawn().await;
    let user = app.seed_user(Role::User).await;
    let shirt = app.seed_product("Shirt", 25.0, 10).await;
    let cap = app.seed_product("Cap", 12.0, 10).await;

    app.repository
        .upsert_cart_item(user.id, shirt.id, 1, None, None)
        .await
        .expect("Failed to seed cart");
    app.repository
        .upsert_cart_item(user.id, cap.id, 2, None, None)
        .await
        .expect("Failed to seed cart");

    let response = app
        .client
        .delete(format!("{}/cart", app.address))
        .header("cookie", app.cookie_for(&user))
        .send()
        .await
        .expect("Failed to clear cart");
    assert_eq!(response.status(), 200);

    let cart = app
        .repository
        .cart_items_for_user(user.id)
        .await
        .expect("Failed to read cart");
    assert!(cart.is_empty());

    app.cleanup().await;
}

#[tokio::test]
async fn wishlist_rejects_duplicates_with_conflict() {
    let app = TestApp::spawn().await;
    let user = app.seed_user(Role::User).await;
    let product = app.seed_product("Boots", 150.0, 5).await;
    let cookie = app.cookie_for(&user);

    let first = app
        .client
        .post(format!("{}/wishlist", app.address))
        .header("cookie", &cookie)
        .json(&json!({ "productId": product.id }))
        .send()
        .await
        .expect("Failed to add wishlist item");
    assert_eq!(first.status(), 201);

    let second = app
        .client
        .post(format!("{}/wishlist", app.address))
        .header("cookie", &cookie)
        .json(&json!({ "productId": product.id }))
        .send()
        .await
        .expect("Failed to add wishlist item");
    assert_eq!(second.status(), 409);

    let body: serde_json::Value = second.json().await.expect("Invalid JSON");
    assert_eq!(body["message"], "Product is already on your wishlist");

    let list = app
        .client
        .get(format!("{}/wishlist", app.address))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("Failed to fetch wishlist");
    let body: serde_json::Value = list.json().await.expect("Invalid JSON");
    let items = body["data"].as_array().expect("wishlist missing");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product"]["name"], "Boots");

    app.cleanup().await;
}

#[tokio::test]
async fn removing_a_wishlist_entry_that_is_not_there_is_not_found() {
    let app = TestApp::spawn().await;
    let user = app.seed_user(Role::User).await;
    let product = app.seed_product("Scarf", 20.0, 5).await;
    let cookie = app.cookie_for(&user);

    let missing = app
        .client
        .delete(format!("{}/wishlist/{}", app.address, product.id))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("Failed to remove wishlist item");
    assert_eq!(missing.status(), 404);

    let add = app
        .client
        .post(format!("{}/wishlist", app.address))
        .header("cookie", &cookie)
        .json(&json!({ "productId": product.id }))
        .send()
        .await
        .expect("Failed to add wishlist item");
    assert_eq!(add.status(), 201);

    let remove = app
        .client
        .delete(format!("{}/wishlist/{}", app.address, product.id))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("Failed to remove wishlist item");
    assert_eq!(remove.status(), 200);

    app.cleanup().await;
}

#[tokio::test]
async fn cart_requires_a_session() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/cart", app.address))
        .send()
        .await
        .expect("Failed to fetch cart");
    assert_eq!(response.status(), 401);

    app.cleanup().await;
}
