//! Payment authorization.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::value_objects::{Money, StoreId};
use crate::Result;

#[derive(Clone, Debug)]
pub struct PaymentRequest {
    pub store_id: StoreId,
    pub amount: Money,
    pub line_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentDecision {
    Approved { reference: String },
    Declined { reason: String },
}

/// Authorizes a checkout total before any cart state changes.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(&self, request: &PaymentRequest) -> Result<PaymentDecision>;
}

/// Approves every request. No real payment provider is wired in yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedPaymentGateway;

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn authorize(&self, request: &PaymentRequest) -> Result<PaymentDecision> {
        tracing::debug!(store_id = %request.store_id, amount = %request.amount, "Simulated payment approved");
        Ok(PaymentDecision::Approved { reference: format!("sim-{}", Uuid::now_v7()) })
    }
}

/// Declines every request with a fixed reason.
#[derive(Debug, Clone)]
pub struct DecliningPaymentGateway {
    reason: String,
}

impl DecliningPaymentGateway {
    pub fn new(reason: impl Into<String>) -> Self { Self { reason: reason.into() } }
}

#[async_trait]
impl PaymentGateway for DecliningPaymentGateway {
    async fn authorize(&self, _request: &PaymentRequest) -> Result<PaymentDecision> {
        Ok(PaymentDecision::Declined { reason: self.reason.clone() })
    }
}
