//! Shared test harness: boots the application on a random port against a
//! throwaway database and drives it over HTTP.
//!
//! Requires a MongoDB replica set (transactions) reachable at
//! `TEST_MONGODB_URI`, defaulting to `mongodb://localhost:27017`.

use mongodb::bson::DateTime;
use secrecy::Secret;
use std::time::Duration;
use storefront_service::config::{
    AuthConfig, Config, DatabaseConfig, ServerConfig, SmtpConfig,
};
use storefront_service::models::{
    Order, OrderItem, OrderStatus, PaymentStatus, PaymentTransaction, Product, Role,
    ShippingAddress, StatusHistoryEntry, User,
};
use storefront_service::services::{JwtService, StoreRepository};
use storefront_service::Application;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub db: mongodb::Database,
    pub repository: StoreRepository,
    pub jwt: JwtService,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let db_name = format!("store_test_{}", Uuid::new_v4().simple());

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // random port
            },
            database: DatabaseConfig {
                url: Secret::new(
                    std::env::var("TEST_MONGODB_URI")
                        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
                ),
                db_name: db_name.clone(),
            },
            auth: AuthConfig {
                jwt_secret: Secret::new("test-secret".to_string()),
                token_cookie: "token".to_string(),
                token_expiry_hours: 1,
            },
            smtp: SmtpConfig {
                enabled: false,
                host: "localhost".to_string(),
                port: 587,
                user: String::new(),
                password: Secret::new(String::new()),
                from_email: "orders@store.local".to_string(),
                from_name: "Storefront".to_string(),
            },
            service_name: "storefront-service-test".to_string(),
        };

        let jwt = JwtService::new(&config.auth);

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let db = app.db().clone();
        let repository = app.repository();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let address = format!("http://127.0.0.1:{}", port);

        // Wait for the server to accept requests.
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if let Ok(response) = client.get(&health_url).send().await {
                if response.status().is_success() {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        Self {
            address,
            db,
            repository,
            jwt,
            client,
        }
    }

    pub async fn cleanup(&self) {
        self.db.drop(None).await.ok();
    }

    pub fn cookie_for(&self, user: &User) -> String {
        let token = self
            .jwt
            .issue(user.id, &user.email, user.role)
            .expect("Failed to issue test token");
        format!("token={}", token)
    }

    pub async fn seed_user(&self, role: Role) -> User {
        let suffix = Uuid::new_v4().simple().to_string();
        let user = User::new(&format!("user-{}@example.com", suffix), "Test User", role);
        self.repository
            .insert_user(&user)
            .await
            .expect("Failed to seed user");
        user
    }

    pub async fn seed_product(&self, name: &str, price: f64, inventory: i64) -> Product {
        let product = Product::new(name, price, "apparel", inventory);
        self.repository
            .insert_product(&product)
            .await
            .expect("Failed to seed product");
        product
    }

    pub async fn seed_order(
        &self,
        user: &User,
        lines: &[(&Product, i64)],
        status: OrderStatus,
    ) -> Order {
        let now = DateTime::now();
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|(product, quantity)| OrderItem {
                product_id: product.id,
                name: product.name.clone(),
                quantity: *quantity,
                unit_price: product.price,
                currency: product.currency.clone(),
            })
            .collect();
        let total_amount = items
            .iter()
            .map(|item| item.unit_price * item.quantity as f64)
            .sum();

        let order = Order {
            id: Uuid::new_v4(),
            user_id: user.id,
            items,
            shipping_address: sample_address(),
            total_amount,
            currency: "USD".to_string(),
            status,
            cancellation_reason: None,
            admin_notes: None,
            status_history: vec![StatusHistoryEntry {
                status: OrderStatus::Pending,
                note: "Order placed".to_string(),
                timestamp: now,
            }],
            created_at: now,
            updated_at: now,
        };

        self.repository
            .insert_order(&order)
            .await
            .expect("Failed to seed order");
        order
    }

    pub async fn seed_transaction(
        &self,
        order: &Order,
        status: PaymentStatus,
    ) -> PaymentTransaction {
        let now = DateTime::now();
        let transaction = PaymentTransaction {
            id: Uuid::new_v4(),
            order_id: order.id,
            amount: order.total_amount,
            currency: order.currency.clone(),
            status,
            created_at: now,
            updated_at: now,
        };
        self.repository
            .insert_transaction(&transaction)
            .await
            .expect("Failed to seed transaction");
        transaction
    }

    pub async fn product_inventory(&self, product_id: Uuid) -> i64 {
        self.repository
            .find_product(product_id)
            .await
            .expect("Failed to read product")
            .expect("Product missing")
            .inventory
    }

    pub async fn order_status(&self, order_id: Uuid) -> OrderStatus {
        self.repository
            .find_order(order_id)
            .await
            .expect("Failed to read order")
            .expect("Order missing")
            .status
    }

    pub async fn cancellation_count(&self, order_id: Uuid) -> u64 {
        self.repository
            .count_cancellations_for_order(order_id)
            .await
            .expect("Failed to count cancellations")
    }

    pub async fn transaction_status(&self, transaction_id: Uuid) -> PaymentStatus {
        use mongodb::bson::doc;
        self.db
            .collection::<PaymentTransaction>("transactions")
            .find_one(doc! { "_id": transaction_id.to_string() }, None)
            .await
            .expect("Failed to read transaction")
            .expect("Transaction missing")
            .status
    }
}

pub fn sample_address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Test User".to_string(),
        line1: "1 Test Street".to_string(),
        line2: None,
        city: "Testville".to_string(),
        state: "TS".to_string(),
        postal_code: "12345".to_string(),
        country: "US".to_string(),
        phone: None,
    }
}
