//! OpenSASE Storefront
//!
//! Catalog, cart and checkout backend for multi-store shops.
//!
//! ## Features
//! - Store and product catalog browsing and search
//! - Per-store shopping cart with quantity merging
//! - Checkout by status flip or by archiving into order history
//! - Self-healing Postgres connection with a background health monitor

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

use thiserror::Error;

use crate::infrastructure::connection::ConnectionError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("store not found")]
    StoreNotFound,

    #[error("product not found")]
    ProductNotFound,

    #[error("product not found in cart")]
    CartLineNotFound,

    #[error("no items in cart to checkout")]
    EmptyCart,

    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("checkout rolled back: {0}")]
    Transaction(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl EcommerceError {
    /// Errors caused by the storage layer rather than the caller.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Database(_) | Self::Transaction(_) | Self::Storage(_))
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(EcommerceError::Storage("down".into()).is_storage_failure());
        assert!(EcommerceError::Connection(ConnectionError::NotInitialized).is_storage_failure());
        assert!(!EcommerceError::CartLineNotFound.is_storage_failure());
        assert!(!EcommerceError::EmptyCart.is_storage_failure());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(EcommerceError::CartLineNotFound.to_string(), "product not found in cart");
        assert_eq!(EcommerceError::Validation("Invalid quantity".into()).to_string(), "Invalid quantity");
    }
}
