use api_state::ApiState;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use routes::{
    liveness::live,
    orders::{create_order, get_all_orders, get_order_by_id},
    products::{get_product_by_id, get_products},
    promo_code::validate_promo_code,
    readiness::ready,
};
use tower_http::catch_panic::CatchPanicLayer;

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public, unauthenticated endpoints (for k8s/systemd probes)
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let api = Router::new()
        .route("/promo_code/validate", post(validate_promo_code))
        .route("/products", get(get_products))
        .route("/products/{id}", get(get_product_by_id))
        .route("/orders", post(create_order).get(get_all_orders))
        .route("/orders/{id}", get(get_order_by_id));

    probes
        .merge(api)
        // A panicking handler becomes a 500 instead of tearing the process down.
        .layer(CatchPanicLayer::new())
}
