//! In-memory implementation of [`CatalogRepository`].
//!
//! Mirrors the `PostgreSQL` semantics closely enough to exercise the service
//! and HTTP layers without a database:
//!
//! - Cart upserts merge quantities into the single in-cart line
//! - The migrating checkout runs against a staged copy of the tables and
//!   only replaces the live tables when every step succeeded
//! - Faults can be injected into the order-history insert or the whole store

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::repository::CatalogRepository;
use crate::domain::aggregates::{CartItem, CartLine, CartLineStatus, OrderHistoryEntry, OrderStatus, Product, StoreInfo};
use crate::domain::value_objects::{ProductId, Quantity, SortOrder, StoreId};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Default)]
struct Tables {
    stores: Vec<StoreInfo>,
    products: Vec<Product>,
    cart: Vec<CartLine>,
    order_history: Vec<OrderHistoryEntry>,
    next_cart_id: i32,
    next_order_id: i32,
}

#[derive(Clone, Copy, Debug, Default)]
struct Faults {
    unavailable: bool,
    /// 1-based index of the order-history insert that fails.
    fail_order_insert_at: Option<usize>,
    /// Delay applied before every cart read.
    stall_cart_reads: Option<Duration>,
}

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    tables: Mutex<Tables>,
    faults: Mutex<Faults>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self { Self::default() }

    pub fn with_catalog(stores: Vec<StoreInfo>, products: Vec<Product>) -> Self {
        let repo = Self::new();
        if let Ok(mut t) = repo.tables.lock() {
            t.stores = stores;
            t.products = products;
        }
        repo
    }

    /// Makes every operation fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut f) = self.faults.lock() { f.unavailable = unavailable; }
    }

    /// Fails the `n`th order-history insert of the next migrating checkouts.
    pub fn fail_order_insert_at(&self, n: Option<usize>) {
        if let Ok(mut f) = self.faults.lock() { f.fail_order_insert_at = n; }
    }

    /// Delays every cart read, as a slow or locked table would.
    pub fn stall_cart_reads(&self, delay: Option<Duration>) {
        if let Ok(mut f) = self.faults.lock() { f.stall_cart_reads = delay; }
    }

    /// Raw cart rows for a store, in every status.
    pub fn cart_lines(&self, store_id: StoreId) -> Vec<CartLine> {
        self.tables.lock().map(|t| t.cart.iter().filter(|l| l.store_id == store_id.value()).cloned().collect()).unwrap_or_default()
    }

    pub fn order_history(&self) -> Vec<OrderHistoryEntry> {
        self.tables.lock().map(|t| t.order_history.clone()).unwrap_or_default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        let faults = self.faults()?;
        if faults.unavailable { return Err(EcommerceError::Storage("connection refused".into())); }
        self.tables.lock().map_err(|_| EcommerceError::Storage("table lock poisoned".into()))
    }

    fn faults(&self) -> Result<Faults> {
        self.faults.lock().map(|f| *f).map_err(|_| EcommerceError::Storage("fault lock poisoned".into()))
    }

    fn select_products(&self, filter: impl Fn(&Product) -> bool) -> Result<Vec<Product>> {
        Ok(self.tables()?.products.iter().filter(|p| filter(p)).cloned().collect())
    }
}

fn newest_first(mut products: Vec<Product>, limit: Option<usize>) -> Vec<Product> {
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    if let Some(limit) = limit { products.truncate(limit); }
    products
}

fn by_name(mut products: Vec<Product>) -> Vec<Product> {
    products.sort_by(|a, b| a.product_name.cmp(&b.product_name));
    products
}

fn quantity_overflow() -> EcommerceError {
    EcommerceError::Validation("Cart quantity exceeds the supported maximum".into())
}

fn is_open_line(line: &CartLine, store_id: StoreId, product_id: ProductId) -> bool {
    line.store_id == store_id.value() && line.product_id == product_id.value() && line.status == CartLineStatus::InCart
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn ping(&self) -> Result<()> {
        self.tables().map(|_| ())
    }

    async fn list_stores(&self) -> Result<Vec<StoreInfo>> {
        Ok(self.tables()?.stores.clone())
    }

    async fn get_store(&self, id: StoreId) -> Result<StoreInfo> {
        self.tables()?.stores.iter().find(|s| s.id == id.value()).cloned().ok_or(EcommerceError::StoreNotFound)
    }

    async fn featured_products(&self, store_id: StoreId) -> Result<Vec<Product>> {
        Ok(newest_first(self.select_products(|p| p.store_id == store_id.value())?, Some(3)))
    }

    async fn newest_products(&self, store_id: StoreId) -> Result<Vec<Product>> {
        Ok(newest_first(self.select_products(|p| p.store_id == store_id.value())?, Some(1)))
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>> {
        Ok(by_name(self.select_products(|p| p.name_matches(query))?))
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.tables()?.products.iter().find(|p| p.id == id.value()).cloned().ok_or(EcommerceError::ProductNotFound)
    }

    async fn search_store_products(&self, store_id: StoreId, query: &str) -> Result<Vec<Product>> {
        Ok(by_name(self.select_products(|p| p.store_id == store_id.value() && p.name_matches(query))?))
    }

    async fn store_products_by_price(&self, store_id: StoreId, order: SortOrder) -> Result<Vec<Product>> {
        let mut products = self.select_products(|p| p.store_id == store_id.value())?;
        products.sort_by(|a, b| match order {
            SortOrder::Asc => a.price.cmp(&b.price),
            SortOrder::Desc => b.price.cmp(&a.price),
        }.then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn store_products_in_category(&self, store_id: StoreId, category: &str) -> Result<Vec<Product>> {
        Ok(newest_first(self.select_products(|p| p.store_id == store_id.value() && p.category == category)?, None))
    }

    async fn products_in_category(&self, category: &str) -> Result<Vec<Product>> {
        Ok(newest_first(self.select_products(|p| p.category == category)?, None))
    }

    async fn add_to_cart(&self, store_id: StoreId, product_id: ProductId, quantity: Quantity) -> Result<()> {
        let mut t = self.tables()?;
        if let Some(line) = t.cart.iter_mut().find(|l| is_open_line(l, store_id, product_id)) {
            line.quantity = line.quantity.checked_add(quantity.value()).ok_or_else(quantity_overflow)?;
            return Ok(());
        }
        t.next_cart_id += 1;
        let id = t.next_cart_id;
        t.cart.push(CartLine {
            id, store_id: store_id.value(), product_id: product_id.value(), quantity: quantity.value(),
            added_at: Utc::now(), status: CartLineStatus::InCart, checked_out_at: None,
        });
        Ok(())
    }

    async fn list_cart(&self, store_id: StoreId) -> Result<Vec<CartItem>> {
        if let Some(delay) = self.faults()?.stall_cart_reads {
            tokio::time::sleep(delay).await;
        }
        let t = self.tables()?;
        let items = t.cart.iter()
            .filter(|l| l.store_id == store_id.value() && l.status == CartLineStatus::InCart)
            .filter_map(|l| {
                t.products.iter().find(|p| p.id == l.product_id).map(|p| CartItem {
                    id: p.id, product_name: p.product_name.clone(), price: p.price, quantity: l.quantity,
                    created_at: p.created_at, updated_at: p.updated_at, category: p.category.clone(),
                    brand: p.brand.clone(), model: p.model.clone(), store_id: p.store_id,
                    is_recommended: p.is_recommended, image_path: p.image_path.clone(),
                })
            })
            .collect();
        Ok(items)
    }

    async fn remove_from_cart(&self, store_id: StoreId, product_id: ProductId) -> Result<()> {
        let mut t = self.tables()?;
        let before = t.cart.len();
        t.cart.retain(|l| !is_open_line(l, store_id, product_id));
        if t.cart.len() == before { return Err(EcommerceError::CartLineNotFound); }
        Ok(())
    }

    async fn checkout(&self, store_id: StoreId) -> Result<Vec<OrderHistoryEntry>> {
        let faults = self.faults()?;
        let mut live = self.tables()?;
        let mut staged = live.clone();

        let lines: Vec<CartLine> = staged.cart.iter()
            .filter(|l| l.store_id == store_id.value() && l.status == CartLineStatus::InCart)
            .cloned()
            .collect();

        let mut archived = Vec::with_capacity(lines.len());
        for (n, line) in lines.into_iter().enumerate() {
            if faults.fail_order_insert_at == Some(n + 1) {
                return Err(EcommerceError::Transaction("failed to insert order into order_history: injected fault".into()));
            }
            staged.next_order_id += 1;
            let entry = OrderHistoryEntry {
                id: staged.next_order_id, store_id: line.store_id, product_id: line.product_id,
                quantity: line.quantity, status: OrderStatus::Ordered,
            };
            staged.order_history.push(entry.clone());
            staged.cart.retain(|l| l.id != line.id);
            archived.push(entry);
        }

        *live = staged;
        Ok(archived)
    }

    async fn finalize_cart_status(&self, store_id: StoreId) -> Result<u64> {
        let mut t = self.tables()?;
        let now = Utc::now();
        let mut flipped = 0;
        for line in t.cart.iter_mut().filter(|l| l.store_id == store_id.value() && l.status == CartLineStatus::InCart) {
            line.status = CartLineStatus::CheckedOut;
            line.checked_out_at = Some(now);
            flipped += 1;
        }
        Ok(flipped)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::domain::value_objects::Money;
    use chrono::Duration;
    use rust_decimal::Decimal;

    pub fn store(id: i32) -> StoreInfo {
        StoreInfo {
            id, logo_path: format!("/logos/{id}.png"), store_name: format!("Store {id}"), description: "Music gear".into(),
            address: "1 Main St".into(), phone_number: "0800000000".into(), email: format!("store{id}@example.com"),
        }
    }

    pub fn product(id: i32, store_id: i32, name: &str, price: i64, category: &str, age_days: i64) -> Product {
        let created = Utc::now() - Duration::days(age_days);
        Product {
            id, product_name: name.into(), price: Money::new(Decimal::new(price, 0)), quantity: 10,
            created_at: created, updated_at: created, category: category.into(), brand: "Acme".into(),
            model: format!("M{id}"), store_id, is_recommended: false, image_path: format!("/img/{id}.png"),
        }
    }

    /// Store 1 sells A (10) and B (5); store 2 sells C (99).
    pub fn repository() -> InMemoryCatalogRepository {
        InMemoryCatalogRepository::with_catalog(
            vec![store(1), store(2)],
            vec![
                product(1, 1, "Guitar A", 10, "guitar", 3),
                product(2, 1, "Bass B", 5, "bass", 2),
                product(3, 2, "Drum C", 99, "drum", 1),
            ],
        )
    }
}
