//! Repository trait for catalog and cart storage.

use async_trait::async_trait;

use crate::domain::aggregates::{CartItem, OrderHistoryEntry, Product, StoreInfo};
use crate::domain::value_objects::{ProductId, Quantity, SortOrder, StoreId};
use crate::Result;

/// Storage operations behind the storefront.
///
/// Point lookups and deletes report missing rows with a dedicated
/// `EcommerceError` variant instead of a generic failure.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Liveness of the backing store.
    async fn ping(&self) -> Result<()>;

    async fn list_stores(&self) -> Result<Vec<StoreInfo>>;

    /// Fails with `StoreNotFound` when the id is unknown.
    async fn get_store(&self, id: StoreId) -> Result<StoreInfo>;

    /// The three most recently created products of a store.
    async fn featured_products(&self, store_id: StoreId) -> Result<Vec<Product>>;

    /// The single most recently created product of a store.
    async fn newest_products(&self, store_id: StoreId) -> Result<Vec<Product>>;

    /// Case-insensitive substring match on the product name, ordered by name.
    async fn search_products(&self, query: &str) -> Result<Vec<Product>>;

    /// Fails with `ProductNotFound` when the id is unknown.
    async fn get_product(&self, id: ProductId) -> Result<Product>;

    async fn search_store_products(&self, store_id: StoreId, query: &str) -> Result<Vec<Product>>;

    async fn store_products_by_price(&self, store_id: StoreId, order: SortOrder) -> Result<Vec<Product>>;

    async fn store_products_in_category(&self, store_id: StoreId, category: &str) -> Result<Vec<Product>>;

    async fn products_in_category(&self, category: &str) -> Result<Vec<Product>>;

    /// Adds `quantity` to the in-cart line for (store, product), creating it if absent.
    async fn add_to_cart(&self, store_id: StoreId, product_id: ProductId, quantity: Quantity) -> Result<()>;

    /// In-cart lines of a store joined with their products. Empty carts yield an empty list.
    async fn list_cart(&self, store_id: StoreId) -> Result<Vec<CartItem>>;

    /// Fails with `CartLineNotFound` when no in-cart line matched.
    async fn remove_from_cart(&self, store_id: StoreId, product_id: ProductId) -> Result<()>;

    /// Moves every in-cart line of a store into order history in one transaction.
    async fn checkout(&self, store_id: StoreId) -> Result<Vec<OrderHistoryEntry>>;

    /// Marks every in-cart line of a store as checked out. Returns the number of lines flipped.
    async fn finalize_cart_status(&self, store_id: StoreId) -> Result<u64>;
}
