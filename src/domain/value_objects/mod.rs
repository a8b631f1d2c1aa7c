//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store identifier value object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(i32);

/// Product identifier value object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i32);

macro_rules! positive_id {
    ($name:ident, $err:expr) => {
        impl $name {
            pub fn new(value: i32) -> Result<Self, IdError> {
                if value <= 0 { return Err($err); }
                Ok(Self(value))
            }
            pub fn value(&self) -> i32 { self.0 }
        }

        impl FromStr for $name {
            type Err = IdError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s.trim().parse::<i32>().map_err(|_| $err)?;
                Self::new(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }
    };
}

positive_id!(StoreId, IdError::InvalidStoreId);
positive_id!(ProductId, IdError::InvalidProductId);

#[derive(Debug, Clone, PartialEq, Eq)] pub enum IdError { InvalidStoreId, InvalidProductId }
impl std::error::Error for IdError {}
impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::InvalidStoreId => write!(f, "Invalid store ID"), Self::InvalidProductId => write!(f, "Invalid product ID") }
    }
}

/// Requested cart quantity, always at least one
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(i32);

impl Quantity {
    pub fn new(value: i32) -> Result<Self, QuantityError> {
        if value <= 0 { return Err(QuantityError::NotPositive); }
        Ok(Self(value))
    }
    pub fn one() -> Self { Self(1) }
    pub fn value(&self) -> i32 { self.0 }
}

impl Default for Quantity { fn default() -> Self { Self::one() } }

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { NotPositive }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Invalid quantity") }
}

/// Money value object. Prices carry no currency in this catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn add(&self, other: Money) -> Money { Money(self.0 + other.0) }
    pub fn multiply(&self, qty: i32) -> Money { Money(self.0 * Decimal::from(qty)) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Price ordering for full store listings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder { #[default] Asc, Desc }

impl SortOrder {
    /// Unknown values fall back to ascending.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::trim) { Some("desc") => Self::Desc, _ => Self::Asc }
    }
    pub fn as_sql(&self) -> &'static str {
        match self { Self::Asc => "ASC", Self::Desc => "DESC" }
    }
}
