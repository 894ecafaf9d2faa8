//! HTTP API server with observability for the order ledger.
//!
//! Provides REST endpoints for customers, products and orders, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, put};
use domain::{CustomerService, OrderService, ProductService};
use ledger_store::LedgerStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: LedgerStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/", get(routes::home::index))
        .route("/health", get(routes::health::check))
        .route(
            "/customers",
            get(routes::customers::list::<S>).post(routes::customers::create::<S>),
        )
        .route(
            "/customers/{id}",
            get(routes::customers::get::<S>)
                .put(routes::customers::update::<S>)
                .delete(routes::customers::delete::<S>),
        )
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        )
        .route(
            "/products/{id}/stock",
            put(routes::products::update_stock::<S>),
        )
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>).put(routes::orders::update::<S>),
        )
        .route("/orders/{id}/total", get(routes::orders::total::<S>))
        .route("/orders/{id}/cancel", put(routes::orders::cancel::<S>))
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

/// Creates the application state with every service sharing one store.
pub fn create_state<S: LedgerStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        customers: CustomerService::new(store.clone()),
        products: ProductService::new(store.clone()),
        orders: OrderService::new(store),
    })
}
