//! Aggregates module
pub mod store;
pub mod product;
pub mod cart;
pub mod order;

pub use store::StoreInfo;
pub use product::Product;
pub use cart::{Cart, CartItem, CartLine, CartLineStatus};
pub use order::{OrderHistoryEntry, OrderStatus};
