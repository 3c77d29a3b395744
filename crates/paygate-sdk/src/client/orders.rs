//! Order resource.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::{path_id, to_body, HttpClient};
use crate::error::ApiError;

const ORDERS_PATH: &str = "/api/merchant/v1/orders";

/// Order lifecycle calls: create, fetch, and the two-stage payment actions.
#[derive(Clone)]
pub struct Orders {
    http: Arc<dyn HttpClient>,
}

impl Orders {
    pub(crate) fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Register a new order.
    pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> Result<Value, ApiError> {
        self.http.post(ORDERS_PATH, Some(to_body(body)?)).await
    }

    /// Fetch an order by id.
    pub async fn get(&self, order_id: &str) -> Result<Value, ApiError> {
        self.http
            .get(&format!("{}/{}", ORDERS_PATH, path_id(order_id)?))
            .await
    }

    /// Cancel an order that has not been paid.
    pub async fn cancel(&self, order_id: &str) -> Result<Value, ApiError> {
        self.action(order_id, "cancel", None).await
    }

    /// Capture a previously authorized payment, optionally for a partial amount.
    pub async fn capture(&self, order_id: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        self.action(order_id, "capture", body).await
    }

    /// Submit an order whose cart was updated after creation.
    pub async fn submit(&self, order_id: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        self.action(order_id, "submit", body).await
    }

    /// Release an authorization without capturing it.
    pub async fn rollback(&self, order_id: &str) -> Result<Value, ApiError> {
        self.action(order_id, "rollback", None).await
    }

    async fn action(
        &self,
        order_id: &str,
        action: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let path = format!("{}/{}/{}", ORDERS_PATH, path_id(order_id)?, action);
        self.http.post(&path, body.cloned()).await
    }
}
