//! Operation resource.

use std::sync::Arc;

use serde_json::Value;

use super::{path_id, HttpClient};
use crate::error::ApiError;

const OPERATIONS_PATH: &str = "/api/merchant/v1/operations";

/// Read-only access to payment operations.
#[derive(Clone)]
pub struct Operations {
    http: Arc<dyn HttpClient>,
}

impl Operations {
    pub(crate) fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// List operations, filtered by the given query parameters.
    pub async fn list(&self, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        if params.is_empty() {
            return self.http.get(OPERATIONS_PATH).await;
        }

        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();
        self.http
            .get(&format!("{}?{}", OPERATIONS_PATH, query))
            .await
    }

    /// Fetch a single operation.
    pub async fn get(&self, operation_id: &str) -> Result<Value, ApiError> {
        self.http
            .get(&format!("{}/{}", OPERATIONS_PATH, path_id(operation_id)?))
            .await
    }
}
