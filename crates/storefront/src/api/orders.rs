//! Order endpoints.

use async_trait::async_trait;
use coffee_house_core::{Email, Phone};
use reqwest::Method;
use tracing::instrument;

use super::{ApiClient, ApiError};
use crate::order::{OrderGateway, OrderReceipt, OrderRequest, OrderSummary};

/// Header carrying the client order number on creation.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

impl ApiClient {
    /// Past orders placed with the given contact details.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, phone, email))]
    pub async fn customer_orders(
        &self,
        phone: &Phone,
        email: Option<&Email>,
    ) -> Result<Vec<OrderSummary>, ApiError> {
        let mut url = self.endpoint("orders/customer/")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("customer_phone", phone.as_str());
            if let Some(email) = email {
                query.append_pair("customer_email", email.as_str());
            }
        }
        self.send(self.request(Method::GET, url)).await
    }
}

#[async_trait]
impl OrderGateway for ApiClient {
    #[instrument(skip(self, order), fields(order_number = %order.order_number, items = order.items.len()))]
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderReceipt, ApiError> {
        let url = self.endpoint("orders/guest")?;
        let request = self
            .request(Method::POST, url)
            .header(IDEMPOTENCY_KEY_HEADER, order.order_number.as_str())
            .json(order);
        self.send(request).await
    }
}
