pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use store_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::Config;
use middleware::{auth_middleware, require_admin};
use services::{notification, JwtService, OrderService, StoreRepository};

/// Shared application state. One database client and one repository for the
/// whole process, cloned by reference into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub config: Config,
    pub repository: StoreRepository,
    pub orders: OrderService,
    pub jwt: JwtService,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let repository = StoreRepository::new(&client, &db);
        repository.init_indexes().await.map_err(|e| {
            anyhow::anyhow!("Failed to initialize database indexes: {}", e)
        })?;

        services::init_metrics();

        let notifier = notification::from_config(&config.smtp)?;
        if config.smtp.enabled {
            tracing::info!("SMTP notifier initialized");
        } else {
            tracing::info!("notifications disabled, using no-op notifier");
        }

        let jwt = JwtService::new(&config.auth);
        let orders = OrderService::new(repository.clone(), notifier);

        let state = AppState {
            db,
            config: config.clone(),
            repository,
            orders,
            jwt,
        };

        // Port 0 gives a random port for the test harness.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn db(&self) -> &mongodb::Database {
        &self.state.db
    }

    pub fn repository(&self) -> StoreRepository {
        self.state.repository.clone()
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Listening on port {}", self.port);
        let router = build_router(self.state);
        axum::serve(self.listener, router).await?;
        Ok(())
    }
}

fn build_router(state: AppState) -> Router {
    let customer = Router::new()
        .route("/orders", get(handlers::orders::list_my_orders))
        .route("/orders/checkout", post(handlers::orders::checkout))
        .route(
            "/orders/:id",
            get(handlers::orders::get_my_order).delete(handlers::orders::cancel_order),
        )
        .route(
            "/cart",
            get(handlers::cart::get_cart).delete(handlers::cart::clear_cart),
        )
        .route("/cart/items", post(handlers::cart::add_item))
        .route(
            "/cart/items/:id",
            patch(handlers::cart::update_item).delete(handlers::cart::remove_item),
        )
        .route(
            "/wishlist",
            get(handlers::wishlist::get_wishlist).post(handlers::wishlist::add_item),
        )
        .route(
            "/wishlist/:product_id",
            delete(handlers::wishlist::remove_item),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route("/admin/orders", get(handlers::admin_orders::list_orders))
        .route("/admin/orders/:id", get(handlers::admin_orders::get_order))
        .route(
            "/admin/orders/:id/status",
            patch(handlers::admin_orders::update_status),
        )
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .merge(customer)
        .merge(admin)
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
