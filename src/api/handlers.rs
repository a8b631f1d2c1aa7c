//! HTTP handlers.
//!
//! Path ids arrive as strings so a malformed id yields the storefront's own
//! 400 body instead of axum's default path rejection.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use super::error::{ApiResult, AppError};
use super::state::AppState;
use crate::domain::aggregates::{Cart, CartItem, Product, StoreInfo};
use crate::domain::value_objects::{IdError, Money, ProductId, Quantity, SortOrder, StoreId};

fn parse_store_id(raw: &str) -> ApiResult<StoreId> {
    raw.parse().map_err(|e: IdError| AppError::BadRequest(e.to_string()))
}

fn parse_product_id(raw: &str) -> ApiResult<ProductId> {
    raw.parse().map_err(|e: IdError| AppError::BadRequest(e.to_string()))
}

fn non_empty(value: Option<String>, message: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(message.to_string()))
}

fn found(products: Vec<Product>, message: &str) -> ApiResult<Vec<Product>> {
    if products.is_empty() {
        return Err(AppError::NotFound(message.to_string()));
    }
    Ok(products)
}

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub product_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryParams {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SortParams {
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
}

/// Add-to-cart body. Accepts url-encoded and multipart forms; an empty
/// body without a content type means no fields were sent.
#[derive(Debug, Default, Deserialize)]
pub struct AddToCartForm {
    pub quantity: Option<String>,
}

#[async_trait]
impl<S> FromRequest<S> for AddToCartForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();
        let malformed = |e: String| AppError::BadRequest(format!("Malformed form body: {e}"));

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<Self>::from_request(req, state).await.map_err(|e| malformed(e.body_text()))?;
            return Ok(form);
        }

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state).await.map_err(|e| malformed(e.body_text()))?;
            while let Some(field) = multipart.next_field().await.map_err(|e| malformed(e.body_text()))? {
                if field.name() == Some("quantity") {
                    let quantity = field.text().await.map_err(|e| malformed(e.body_text()))?;
                    return Ok(Self { quantity: Some(quantity) });
                }
            }
            return Ok(Self::default());
        }

        let body = Bytes::from_request(req, state).await.map_err(|e| malformed(e.body_text()))?;
        if content_type.is_empty() && body.is_empty() {
            return Ok(Self::default());
        }
        Err(AppError::UnsupportedMediaType(content_type))
    }
}

#[derive(Debug, Validate)]
struct AddToCartRequest {
    #[validate(range(min = 1))]
    quantity: i32,
}

impl AddToCartRequest {
    /// Missing or blank quantity means one unit.
    fn from_form(form: AddToCartForm) -> ApiResult<Self> {
        let invalid = || AppError::BadRequest("Invalid quantity".to_string());
        let quantity = match form.quantity.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(raw) => raw.parse().map_err(|_| invalid())?,
            None => Quantity::one().value(),
        };
        let request = Self { quantity };
        request.validate().map_err(|_| invalid())?;
        Ok(request)
    }
}

#[derive(Debug, Serialize)]
pub struct StoreListResponse {
    pub store_info: Vec<StoreInfo>,
}

#[derive(Debug, Serialize)]
pub struct StoreProductsResponse {
    pub store_id: StoreId,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub store_id: StoreId,
    pub cart_items: Vec<CartItem>,
    pub total_amount: Money,
}

// =============================================================================
// Health
// =============================================================================

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "healthy" }))),
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "reason": "Database connection failed" })),
            )
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

pub async fn list_stores(State(state): State<AppState>) -> ApiResult<Json<StoreListResponse>> {
    let store_info = state.service.list_stores().await?;
    Ok(Json(StoreListResponse { store_info }))
}

pub async fn get_store(State(state): State<AppState>, Path(store_id): Path<String>) -> ApiResult<Json<StoreInfo>> {
    let store_id = parse_store_id(&store_id)?;
    Ok(Json(state.service.get_store(store_id).await?))
}

pub async fn featured_products(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> ApiResult<Json<StoreProductsResponse>> {
    let store_id = parse_store_id(&store_id)?;
    let products = found(state.service.featured_products(store_id).await?, "No products found for this store")?;
    Ok(Json(StoreProductsResponse { store_id, products }))
}

pub async fn newest_products(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> ApiResult<Json<StoreProductsResponse>> {
    let store_id = parse_store_id(&store_id)?;
    let products = found(state.service.newest_products(store_id).await?, "No products found for this store")?;
    Ok(Json(StoreProductsResponse { store_id, products }))
}

pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<impl IntoResponse> {
    let query = non_empty(params.product_name, "Search query is required")?;
    let products = state.service.search_products(&query).await?;
    Ok(Json(json!({ "products": products })))
}

pub async fn get_product(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let id = parse_product_id(&id)?;
    let product = state.service.get_product(id).await?;
    Ok(Json(json!({ "product": product })))
}

pub async fn search_store_products(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<StoreProductsResponse>> {
    let store_id = parse_store_id(&store_id)?;
    let query = non_empty(params.product_name, "Search query is required")?;
    let products = state.service.search_store_products(store_id, &query).await?;
    Ok(Json(StoreProductsResponse { store_id, products }))
}

pub async fn store_products_by_price(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    Query(params): Query<SortParams>,
) -> ApiResult<Json<StoreProductsResponse>> {
    let store_id = parse_store_id(&store_id)?;
    let order = SortOrder::parse_lenient(params.sort_order.as_deref());
    let products = found(state.service.store_products_by_price(store_id, order).await?, "No products found for this store")?;
    Ok(Json(StoreProductsResponse { store_id, products }))
}

pub async fn store_products_in_category(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    Query(params): Query<CategoryParams>,
) -> ApiResult<impl IntoResponse> {
    let store_id = parse_store_id(&store_id)?;
    let category = non_empty(params.category, "Category is required")?;
    let products = found(
        state.service.store_products_in_category(store_id, &category).await?,
        "No products found for this store and category",
    )?;
    Ok(Json(json!({ "store_id": store_id, "category": category, "products": products })))
}

pub async fn products_in_category(
    State(state): State<AppState>,
    Query(params): Query<CategoryParams>,
) -> ApiResult<impl IntoResponse> {
    let category = non_empty(params.category, "Category is required")?;
    let products = found(state.service.products_in_category(&category).await?, "No products found for this category")?;
    Ok(Json(json!({ "category": category, "products": products })))
}

// =============================================================================
// Cart
// =============================================================================

pub async fn add_to_cart(
    State(state): State<AppState>,
    Path((store_id, product_id)): Path<(String, String)>,
    form: AddToCartForm,
) -> ApiResult<impl IntoResponse> {
    let store_id = parse_store_id(&store_id)?;
    let product_id = parse_product_id(&product_id)?;
    let request = AddToCartRequest::from_form(form)?;
    let quantity = Quantity::new(request.quantity).map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.service.add_to_cart(store_id, product_id, quantity).await?;
    Ok(Json(json!({
        "message": "Product added to cart",
        "store_id": store_id,
        "product_id": product_id,
        "quantity": quantity.value(),
    })))
}

pub async fn list_cart(State(state): State<AppState>, Path(store_id): Path<String>) -> ApiResult<Json<CartResponse>> {
    let store_id = parse_store_id(&store_id)?;
    let cart = Cart::new(state.service.list_cart(store_id).await?);
    let total_amount = cart.total();
    Ok(Json(CartResponse { store_id, cart_items: cart.into_items(), total_amount }))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    Path((store_id, product_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let store_id = parse_store_id(&store_id)?;
    let product_id = parse_product_id(&product_id)?;
    state.service.remove_from_cart(store_id, product_id).await?;
    Ok(Json(json!({
        "message": "Product removed from cart",
        "store_id": store_id,
        "product_id": product_id,
    })))
}

pub async fn checkout(State(state): State<AppState>, Path(store_id): Path<String>) -> ApiResult<impl IntoResponse> {
    let store_id = parse_store_id(&store_id)?;
    let receipt = state.service.checkout(store_id).await?;
    Ok(Json(json!({
        "message": "Checkout successful",
        "store_id": receipt.store_id,
        "total_amount": receipt.total_amount,
        "line_count": receipt.line_count,
        "payment_reference": receipt.payment_reference,
        "mode": receipt.mode,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(quantity: Option<&str>) -> AddToCartForm {
        AddToCartForm { quantity: quantity.map(str::to_string) }
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        assert_eq!(AddToCartRequest::from_form(form(None)).unwrap().quantity, 1);
        assert_eq!(AddToCartRequest::from_form(form(Some("  "))).unwrap().quantity, 1);
        assert_eq!(AddToCartRequest::from_form(form(Some("4"))).unwrap().quantity, 4);
    }

    #[test]
    fn test_quantity_must_be_positive_integer() {
        for raw in ["0", "-2", "two", "1.5"] {
            let err = AddToCartRequest::from_form(form(Some(raw))).unwrap_err();
            assert_eq!(err.to_string(), "Invalid quantity", "input {raw}");
        }
    }

    #[test]
    fn test_path_ids_are_validated() {
        assert_eq!(parse_store_id("abc").unwrap_err().to_string(), "Invalid store ID");
        assert_eq!(parse_product_id("0").unwrap_err().to_string(), "Invalid product ID");
        assert_eq!(parse_store_id("7").unwrap().value(), 7);
    }
}
