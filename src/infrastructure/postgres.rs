//! `PostgreSQL` implementation of [`CatalogRepository`].
//!
//! Every call loads the pool from the [`ConnectionManager`], so requests
//! issued after a reconnect use the new pool.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::connection::{ConnectionManager, PgConnector};
use super::repository::CatalogRepository;
use crate::domain::aggregates::{CartItem, CartLineStatus, OrderHistoryEntry, OrderStatus, Product, StoreInfo};
use crate::domain::value_objects::{ProductId, Quantity, SortOrder, StoreId};
use crate::{EcommerceError, Result};

const PRODUCT_COLUMNS: &str = "id, product_name, price, quantity, created_at, updated_at, category, brand, model, store_id, is_recommended, image_path";
/// SQLSTATE raised when the merged quantity overflows `INTEGER`.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";
const STORE_COLUMNS: &str = "id, logo_path, store_name, description, address, phone_number, email";

pub struct PostgresCatalogRepository {
    connections: Arc<ConnectionManager<PgConnector>>,
}

impl PostgresCatalogRepository {
    pub fn new(connections: Arc<ConnectionManager<PgConnector>>) -> Self { Self { connections } }

    fn pool(&self) -> Result<PgPool> {
        Ok(self.connections.handle()?)
    }

    async fn products(&self, sql: &str, bind_store: Option<StoreId>, bind_text: Option<String>) -> Result<Vec<Product>> {
        let pool = self.pool()?;
        let mut query = sqlx::query_as::<_, Product>(sql);
        if let Some(text) = bind_text { query = query.bind(text); }
        if let Some(store_id) = bind_store { query = query.bind(store_id.value()); }
        Ok(query.fetch_all(&pool).await?)
    }
}

fn like_pattern(query: &str) -> String { format!("%{query}%") }

fn rollback(step: &str) -> impl FnOnce(sqlx::Error) -> EcommerceError + '_ {
    move |e| EcommerceError::Transaction(format!("failed to {step}: {e}"))
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn ping(&self) -> Result<()> {
        Ok(self.connections.ping().await?)
    }

    async fn list_stores(&self) -> Result<Vec<StoreInfo>> {
        let pool = self.pool()?;
        let sql = format!("SELECT {STORE_COLUMNS} FROM store_info ORDER BY id");
        Ok(sqlx::query_as::<_, StoreInfo>(&sql).fetch_all(&pool).await?)
    }

    async fn get_store(&self, id: StoreId) -> Result<StoreInfo> {
        let pool = self.pool()?;
        let sql = format!("SELECT {STORE_COLUMNS} FROM store_info WHERE id = $1");
        sqlx::query_as::<_, StoreInfo>(&sql).bind(id.value()).fetch_optional(&pool).await?.ok_or(EcommerceError::StoreNotFound)
    }

    async fn featured_products(&self, store_id: StoreId) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product_info WHERE store_id = $1 ORDER BY created_at DESC LIMIT 3");
        self.products(&sql, Some(store_id), None).await
    }

    async fn newest_products(&self, store_id: StoreId) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product_info WHERE store_id = $1 ORDER BY created_at DESC LIMIT 1");
        self.products(&sql, Some(store_id), None).await
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product_info WHERE product_name ILIKE $1 ORDER BY product_name");
        self.products(&sql, None, Some(like_pattern(query))).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        let pool = self.pool()?;
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product_info WHERE id = $1");
        sqlx::query_as::<_, Product>(&sql).bind(id.value()).fetch_optional(&pool).await?.ok_or(EcommerceError::ProductNotFound)
    }

    async fn search_store_products(&self, store_id: StoreId, query: &str) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product_info WHERE product_name ILIKE $1 AND store_id = $2 ORDER BY product_name");
        self.products(&sql, Some(store_id), Some(like_pattern(query))).await
    }

    async fn store_products_by_price(&self, store_id: StoreId, order: SortOrder) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product_info WHERE store_id = $1 ORDER BY price {}, id", order.as_sql());
        self.products(&sql, Some(store_id), None).await
    }

    async fn store_products_in_category(&self, store_id: StoreId, category: &str) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product_info WHERE category = $1 AND store_id = $2 ORDER BY created_at DESC");
        self.products(&sql, Some(store_id), Some(category.to_string())).await
    }

    async fn products_in_category(&self, category: &str) -> Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM product_info WHERE category = $1 ORDER BY created_at DESC");
        self.products(&sql, None, Some(category.to_string())).await
    }

    #[tracing::instrument(skip(self))]
    async fn add_to_cart(&self, store_id: StoreId, product_id: ProductId, quantity: Quantity) -> Result<()> {
        let pool = self.pool()?;
        // The partial unique index on in_cart rows makes this a single atomic upsert.
        sqlx::query(
            "INSERT INTO cart (store_id, product_id, quantity, added_at, status) VALUES ($1, $2, $3, $4, 'in_cart') \
             ON CONFLICT (store_id, product_id) WHERE status = 'in_cart' \
             DO UPDATE SET quantity = cart.quantity + EXCLUDED.quantity",
        )
        .bind(store_id.value()).bind(product_id.value()).bind(quantity.value()).bind(Utc::now())
        .execute(&pool).await
        .map_err(|e| {
            let overflow = e.as_database_error().and_then(|db| db.code()).as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE);
            if overflow {
                EcommerceError::Validation("Cart quantity exceeds the supported maximum".into())
            } else {
                EcommerceError::Database(e)
            }
        })?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list_cart(&self, store_id: StoreId) -> Result<Vec<CartItem>> {
        let pool = self.pool()?;
        let items = sqlx::query_as::<_, CartItem>(
            "SELECT p.id, p.product_name, p.price, c.quantity, p.created_at, p.updated_at, p.category, p.brand, p.model, p.store_id, p.is_recommended, p.image_path \
             FROM cart c JOIN product_info p ON c.product_id = p.id \
             WHERE c.store_id = $1 AND c.status = $2 ORDER BY c.added_at, c.id",
        )
        .bind(store_id.value()).bind(CartLineStatus::InCart.as_str())
        .fetch_all(&pool).await?;
        Ok(items)
    }

    #[tracing::instrument(skip(self))]
    async fn remove_from_cart(&self, store_id: StoreId, product_id: ProductId) -> Result<()> {
        let pool = self.pool()?;
        let result = sqlx::query("DELETE FROM cart WHERE store_id = $1 AND product_id = $2 AND status = $3")
            .bind(store_id.value()).bind(product_id.value()).bind(CartLineStatus::InCart.as_str())
            .execute(&pool).await?;
        if result.rows_affected() == 0 { return Err(EcommerceError::CartLineNotFound); }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn checkout(&self, store_id: StoreId) -> Result<Vec<OrderHistoryEntry>> {
        let pool = self.pool()?;
        // Dropping `tx` on any early return rolls the whole migration back.
        let mut tx = pool.begin().await.map_err(rollback("begin transaction"))?;

        let lines: Vec<(i32, i32, i32)> = sqlx::query_as(
            "SELECT id, product_id, quantity FROM cart WHERE store_id = $1 AND status = $2 ORDER BY id FOR UPDATE",
        )
        .bind(store_id.value()).bind(CartLineStatus::InCart.as_str())
        .fetch_all(&mut *tx).await.map_err(rollback("fetch cart items"))?;

        let mut archived = Vec::with_capacity(lines.len());
        for (cart_id, product_id, quantity) in lines {
            let id: i32 = sqlx::query_scalar(
                "INSERT INTO order_history (store_id, product_id, quantity, status) VALUES ($1, $2, $3, $4) RETURNING id",
            )
            .bind(store_id.value()).bind(product_id).bind(quantity).bind(OrderStatus::Ordered.as_str())
            .fetch_one(&mut *tx).await.map_err(rollback("insert order into order_history"))?;

            sqlx::query("DELETE FROM cart WHERE id = $1")
                .bind(cart_id)
                .execute(&mut *tx).await.map_err(rollback("delete cart item"))?;

            archived.push(OrderHistoryEntry { id, store_id: store_id.value(), product_id, quantity, status: OrderStatus::Ordered });
        }

        tx.commit().await.map_err(rollback("commit transaction"))?;
        tracing::info!(lines = archived.len(), "Cart migrated to order history");
        Ok(archived)
    }

    #[tracing::instrument(skip(self))]
    async fn finalize_cart_status(&self, store_id: StoreId) -> Result<u64> {
        let pool = self.pool()?;
        let result = sqlx::query("UPDATE cart SET status = $1, checked_out_at = $2 WHERE store_id = $3 AND status = $4")
            .bind(CartLineStatus::CheckedOut.as_str()).bind(Utc::now()).bind(store_id.value()).bind(CartLineStatus::InCart.as_str())
            .execute(&pool).await?;
        Ok(result.rows_affected())
    }
}
