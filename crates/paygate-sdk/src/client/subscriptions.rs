//! Subscription resource.

use std::sync::Arc;

use serde_json::Value;

use super::{path_id, HttpClient};
use crate::error::ApiError;

const SUBSCRIPTIONS_PATH: &str = "/api/merchant/v1/subscriptions";

/// Customer subscription calls.
#[derive(Clone)]
pub struct Subscriptions {
    http: Arc<dyn HttpClient>,
}

impl Subscriptions {
    pub(crate) fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Fetch a subscription.
    pub async fn get(&self, subscription_id: &str) -> Result<Value, ApiError> {
        self.http
            .get(&format!(
                "{}/{}",
                SUBSCRIPTIONS_PATH,
                path_id(subscription_id)?
            ))
            .await
    }

    /// Cancel a subscription.
    pub async fn cancel(&self, subscription_id: &str) -> Result<Value, ApiError> {
        self.http
            .post(
                &format!(
                    "{}/{}/cancel",
                    SUBSCRIPTIONS_PATH,
                    path_id(subscription_id)?
                ),
                None,
            )
            .await
    }
}
