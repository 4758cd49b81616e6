//! Payment gateway contract used when a checkout starts.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment gateway is not configured")]
    NotConfigured,
    #[error("payment gateway unreachable: {0}")]
    Transport(String),
    #[error("payment gateway rejected the order ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected payment gateway response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOrderRequest {
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub payment_capture: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: PaymentOrderRequest) -> Result<PaymentOrder, PaymentError>;
}
