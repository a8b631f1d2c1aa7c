//! Storefront service facade.
//!
//! Decouples the HTTP layer from storage. Catalog and cart calls pass
//! straight through to the repository; errors are never rewritten here.

pub mod payment;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::domain::aggregates::{Cart, CartItem, Product, StoreInfo};
use crate::domain::events::{CartEvent, DomainEvent, EventEnvelope};
use crate::domain::value_objects::{Money, ProductId, Quantity, SortOrder, StoreId};
use crate::infrastructure::{CatalogRepository, EventPublisher};
use crate::{EcommerceError, Result};

use payment::{PaymentDecision, PaymentGateway, PaymentRequest};

/// Cart transition applied once payment is approved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    /// Marks lines `checked_out` in place.
    #[default]
    StatusFlip,
    /// Archives lines into order history and deletes them.
    Migrate,
}

impl FromStr for CheckoutMode {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status_flip" => Ok(Self::StatusFlip),
            "migrate" => Ok(Self::Migrate),
            other => Err(format!("unknown checkout mode '{other}'")),
        }
    }
}

impl fmt::Display for CheckoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::StatusFlip => write!(f, "status_flip"), Self::Migrate => write!(f, "migrate") }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckoutReceipt {
    pub store_id: StoreId,
    pub total_amount: Money,
    pub line_count: usize,
    pub payment_reference: String,
    pub mode: CheckoutMode,
}

pub struct StorefrontService {
    repository: Arc<dyn CatalogRepository>,
    payments: Arc<dyn PaymentGateway>,
    events: Arc<dyn EventPublisher>,
    checkout_mode: CheckoutMode,
}

impl StorefrontService {
    pub fn new(
        repository: Arc<dyn CatalogRepository>,
        payments: Arc<dyn PaymentGateway>,
        events: Arc<dyn EventPublisher>,
        checkout_mode: CheckoutMode,
    ) -> Self {
        Self { repository, payments, events, checkout_mode }
    }

    pub async fn ping(&self) -> Result<()> { self.repository.ping().await }

    pub async fn list_stores(&self) -> Result<Vec<StoreInfo>> { self.repository.list_stores().await }

    pub async fn get_store(&self, id: StoreId) -> Result<StoreInfo> { self.repository.get_store(id).await }

    pub async fn featured_products(&self, store_id: StoreId) -> Result<Vec<Product>> {
        self.repository.featured_products(store_id).await
    }

    pub async fn newest_products(&self, store_id: StoreId) -> Result<Vec<Product>> {
        self.repository.newest_products(store_id).await
    }

    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>> { self.repository.search_products(query).await }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> { self.repository.get_product(id).await }

    pub async fn search_store_products(&self, store_id: StoreId, query: &str) -> Result<Vec<Product>> {
        self.repository.search_store_products(store_id, query).await
    }

    pub async fn store_products_by_price(&self, store_id: StoreId, order: SortOrder) -> Result<Vec<Product>> {
        self.repository.store_products_by_price(store_id, order).await
    }

    pub async fn store_products_in_category(&self, store_id: StoreId, category: &str) -> Result<Vec<Product>> {
        self.repository.store_products_in_category(store_id, category).await
    }

    pub async fn products_in_category(&self, category: &str) -> Result<Vec<Product>> {
        self.repository.products_in_category(category).await
    }

    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, store_id: StoreId, product_id: ProductId, quantity: Quantity) -> Result<()> {
        self.repository.add_to_cart(store_id, product_id, quantity).await?;
        self.emit(CartEvent::ItemAdded { store_id: store_id.value(), product_id: product_id.value(), quantity: quantity.value() }).await;
        Ok(())
    }

    pub async fn list_cart(&self, store_id: StoreId) -> Result<Vec<CartItem>> { self.repository.list_cart(store_id).await }

    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, store_id: StoreId, product_id: ProductId) -> Result<()> {
        self.repository.remove_from_cart(store_id, product_id).await?;
        self.emit(CartEvent::ItemRemoved { store_id: store_id.value(), product_id: product_id.value() }).await;
        Ok(())
    }

    /// Prices the current cart, authorizes payment and applies the configured transition.
    ///
    /// The total comes from the snapshot read before the transition; prices
    /// and quantities are not re-validated afterwards. A declined payment
    /// leaves the cart untouched.
    #[instrument(skip(self))]
    pub async fn checkout(&self, store_id: StoreId) -> Result<CheckoutReceipt> {
        let cart = Cart::new(self.repository.list_cart(store_id).await?);
        if cart.is_empty() {
            return Err(EcommerceError::EmptyCart);
        }

        let request = PaymentRequest { store_id, amount: cart.total(), line_count: cart.item_count() };
        let payment_reference = match self.payments.authorize(&request).await? {
            PaymentDecision::Approved { reference } => reference,
            PaymentDecision::Declined { reason } => {
                tracing::warn!(%store_id, %reason, "Payment declined");
                return Err(EcommerceError::PaymentDeclined(reason));
            }
        };

        let transitioned = match self.checkout_mode {
            CheckoutMode::StatusFlip => self.repository.finalize_cart_status(store_id).await? as usize,
            CheckoutMode::Migrate => self.repository.checkout(store_id).await?.len(),
        };
        if transitioned != cart.item_count() {
            tracing::warn!(%store_id, priced = cart.item_count(), transitioned, "Cart changed between pricing and checkout");
        }

        self.emit(CartEvent::CheckedOut { store_id: store_id.value(), line_count: cart.item_count(), total_amount: request.amount }).await;
        tracing::info!(%store_id, total = %request.amount, mode = %self.checkout_mode, "Checkout successful");

        Ok(CheckoutReceipt {
            store_id,
            total_amount: request.amount,
            line_count: cart.item_count(),
            payment_reference,
            mode: self.checkout_mode,
        })
    }

    async fn emit(&self, event: CartEvent) {
        let envelope = EventEnvelope::new(DomainEvent::Cart(event));
        if let Err(err) = self.events.publish(&envelope).await {
            tracing::warn!(error = %err, subject = %envelope.event.subject(), "Failed to publish domain event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::payment::{DecliningPaymentGateway, SimulatedPaymentGateway};
    use super::*;
    use crate::domain::aggregates::CartLineStatus;
    use crate::infrastructure::in_memory::fixtures::repository;
    use crate::infrastructure::{InMemoryCatalogRepository, RecordingEventPublisher};
    use rust_decimal::Decimal;

    fn sid(v: i32) -> StoreId { StoreId::new(v).unwrap() }
    fn pid(v: i32) -> ProductId { ProductId::new(v).unwrap() }
    fn qty(v: i32) -> Quantity { Quantity::new(v).unwrap() }

    struct Harness {
        repo: Arc<InMemoryCatalogRepository>,
        events: Arc<RecordingEventPublisher>,
        service: StorefrontService,
    }

    fn harness(payments: Arc<dyn PaymentGateway>, mode: CheckoutMode) -> Harness {
        let repo = Arc::new(repository());
        let events = Arc::new(RecordingEventPublisher::default());
        let service = StorefrontService::new(repo.clone(), payments, events.clone(), mode);
        Harness { repo, events, service }
    }

    async fn fill_cart(service: &StorefrontService) {
        service.add_to_cart(sid(1), pid(1), qty(2)).await.unwrap();
        service.add_to_cart(sid(1), pid(1), qty(3)).await.unwrap();
        service.add_to_cart(sid(1), pid(2), qty(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_end_to_end_status_flip_checkout() {
        let h = harness(Arc::new(SimulatedPaymentGateway), CheckoutMode::StatusFlip);
        fill_cart(&h.service).await;

        let cart = h.service.list_cart(sid(1)).await.unwrap();
        let quantities: Vec<_> = cart.iter().map(|i| (i.id, i.quantity)).collect();
        assert_eq!(quantities, vec![(1, 5), (2, 1)]);

        let receipt = h.service.checkout(sid(1)).await.unwrap();
        assert_eq!(receipt.total_amount.amount(), Decimal::new(55, 0));
        assert_eq!(receipt.line_count, 2);
        assert!(receipt.payment_reference.starts_with("sim-"));
        assert!(h.service.list_cart(sid(1)).await.unwrap().is_empty());
        assert!(h.repo.order_history().is_empty());
        assert!(h.repo.cart_lines(sid(1)).iter().all(|l| l.status == CartLineStatus::CheckedOut));
    }

    #[tokio::test]
    async fn test_end_to_end_migrating_checkout() {
        let h = harness(Arc::new(SimulatedPaymentGateway), CheckoutMode::Migrate);
        fill_cart(&h.service).await;

        let receipt = h.service.checkout(sid(1)).await.unwrap();
        assert_eq!(receipt.total_amount.amount(), Decimal::new(55, 0));
        assert!(h.service.list_cart(sid(1)).await.unwrap().is_empty());
        assert!(h.repo.cart_lines(sid(1)).is_empty());
        assert_eq!(h.repo.order_history().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let h = harness(Arc::new(SimulatedPaymentGateway), CheckoutMode::StatusFlip);
        assert!(matches!(h.service.checkout(sid(1)).await, Err(EcommerceError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_declined_payment_leaves_cart_untouched() {
        let h = harness(Arc::new(DecliningPaymentGateway::new("card expired")), CheckoutMode::StatusFlip);
        fill_cart(&h.service).await;
        let before = h.repo.cart_lines(sid(1));

        let err = h.service.checkout(sid(1)).await.unwrap_err();
        assert!(matches!(err, EcommerceError::PaymentDeclined(ref r) if r == "card expired"));
        assert_eq!(h.repo.cart_lines(sid(1)), before);
        assert!(h.repo.order_history().is_empty());
    }

    #[tokio::test]
    async fn test_failed_migration_surfaces_transaction_error() {
        let h = harness(Arc::new(SimulatedPaymentGateway), CheckoutMode::Migrate);
        fill_cart(&h.service).await;
        h.repo.fail_order_insert_at(Some(1));

        assert!(matches!(h.service.checkout(sid(1)).await, Err(EcommerceError::Transaction(_))));
        assert_eq!(h.service.list_cart(sid(1)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_events_follow_cart_mutations() {
        let h = harness(Arc::new(SimulatedPaymentGateway), CheckoutMode::StatusFlip);
        fill_cart(&h.service).await;
        h.service.remove_from_cart(sid(1), pid(2)).await.unwrap();
        h.service.checkout(sid(1)).await.unwrap();

        let subjects: Vec<_> = h.events.events().iter().map(|e| e.event.subject()).collect();
        assert_eq!(subjects, vec![
            "ecommerce.cart.item_added", "ecommerce.cart.item_added", "ecommerce.cart.item_added",
            "ecommerce.cart.item_removed", "ecommerce.cart.checked_out",
        ]);
    }

    #[tokio::test]
    async fn test_failed_remove_emits_nothing() {
        let h = harness(Arc::new(SimulatedPaymentGateway), CheckoutMode::StatusFlip);
        assert!(matches!(h.service.remove_from_cart(sid(1), pid(1)).await, Err(EcommerceError::CartLineNotFound)));
        assert!(h.events.events().is_empty());
    }

    #[test]
    fn test_checkout_mode_parse() {
        assert_eq!("migrate".parse::<CheckoutMode>().unwrap(), CheckoutMode::Migrate);
        assert_eq!("STATUS_FLIP".parse::<CheckoutMode>().unwrap(), CheckoutMode::StatusFlip);
        assert!("archive".parse::<CheckoutMode>().is_err());
    }
}
