//! HTTP API server for the personal-finance transaction system.
//!
//! Provides REST endpoints for transaction management and saga execution,
//! with structured logging (tracing) and Prometheus metrics. The outbox
//! relay runs alongside the server as a background task.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use common::{CategoryId, UserId};
use domain::{Category, User};
use metrics_exporter_prometheus::PrometheusHandle;
use relay::{OutboxRelay, Publisher, RelayConfig, SpendingPatternAnalyzer, TransactionLogger};
use saga::{SagaCoordinator, SpendingAnalyzer, TransactionService};
use storage::InMemoryStorage;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::transactions::{AppState, Repositories};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Repositories>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/transactions", post(routes::transactions::create::<S>))
        .route("/transactions", get(routes::transactions::list::<S>))
        .route(
            "/transactions/saga",
            post(routes::transactions::create_with_choreography::<S>),
        )
        .route(
            "/transactions/saga/choreography",
            post(routes::transactions::create_with_choreography::<S>),
        )
        .route(
            "/transactions/saga/orchestration",
            post(routes::transactions::create_with_orchestration::<S>),
        )
        .route("/transactions/{id}", get(routes::transactions::get::<S>))
        .route("/transactions/{id}", put(routes::transactions::update::<S>))
        .route(
            "/transactions/{id}",
            delete(routes::transactions::delete::<S>),
        )
        .route(
            "/transactions/user/{user_id}",
            get(routes::transactions::list_for_user::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates in-memory application state seeded with a demo user and category,
/// plus the relay that drains its outbox.
pub async fn create_default_state(
    relay_config: RelayConfig,
) -> (Arc<AppState<InMemoryStorage>>, OutboxRelay<InMemoryStorage>) {
    let storage = Arc::new(InMemoryStorage::new());

    storage
        .insert_user(User {
            id: UserId::new(1),
            name: "demo".to_string(),
        })
        .await;
    storage
        .insert_category(Category {
            id: CategoryId::new(1),
            name: "groceries".to_string(),
        })
        .await;

    let analyzer = SpendingAnalyzer::new();
    let service = TransactionService::new(storage.clone(), analyzer.clone());
    let coordinator = SagaCoordinator::new(storage.clone(), analyzer);

    let mut publisher = Publisher::new();
    publisher.register(Arc::new(TransactionLogger::new()));
    publisher.register(Arc::new(SpendingPatternAnalyzer::new()));
    let relay = OutboxRelay::new(storage.clone(), publisher, relay_config);

    let state = Arc::new(AppState {
        service,
        coordinator,
        storage,
    });

    (state, relay)
}
