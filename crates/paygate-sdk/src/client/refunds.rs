//! Refund resource.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::{path_id, to_body, HttpClient};
use crate::error::ApiError;

/// Refunds against captured orders.
#[derive(Clone)]
pub struct Refunds {
    http: Arc<dyn HttpClient>,
}

impl Refunds {
    pub(crate) fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Request a full or partial refund of an order.
    pub async fn create<B: Serialize + ?Sized>(
        &self,
        order_id: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        let path = format!("/api/merchant/v2/orders/{}/refund", path_id(order_id)?);
        self.http.post(&path, Some(to_body(body)?)).await
    }
}
