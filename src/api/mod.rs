//! HTTP surface of the storefront.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::AppError;
pub use state::AppState;

/// Builds the full router. `/health` sits at the root, everything else under `/api/v1`.
pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/AllStoreInfo", get(handlers::list_stores))
        .route("/store/:store_id", get(handlers::get_store))
        .route("/product/:store_id", get(handlers::featured_products))
        .route("/newproduct/:store_id", get(handlers::newest_products))
        .route("/searchproducts", get(handlers::search_products))
        .route("/products/:product_id", get(handlers::get_product))
        .route("/:store_id/search", get(handlers::search_store_products))
        .route("/Allproduct/:store_id/sort", get(handlers::store_products_by_price))
        .route("/:store_id/by-category", get(handlers::store_products_in_category))
        .route("/category", get(handlers::products_in_category))
        .route("/store/:store_id/product/:product_id/add_to_cart", post(handlers::add_to_cart))
        .route("/store/:store_id/product/:product_id/remove_from_cart", delete(handlers::remove_from_cart))
        .route("/cart/:store_id", get(handlers::list_cart))
        .route("/checkout/:store_id", post(handlers::checkout));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", v1)
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::enforce_deadline))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
