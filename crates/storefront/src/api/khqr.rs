//! KHQR endpoints.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{ApiClient, ApiError, MERCHANT_INFO_KEY};
use crate::payment::{
    MerchantInfo, PaymentGateway, PaymentRequest, QrPayload, TransactionId, VerificationResult,
};

/// Body of `POST /khqr/generate`.
#[derive(Debug, Deserialize)]
struct GeneratedQr {
    #[serde(alias = "qr_string", alias = "qr_code")]
    qr: String,
    #[serde(default)]
    md5: Option<String>,
}

#[async_trait]
impl PaymentGateway for ApiClient {
    #[instrument(skip(self))]
    async fn merchant_info(&self) -> Result<MerchantInfo, ApiError> {
        if let Some(info) = self.inner.merchant_cache.get(MERCHANT_INFO_KEY).await {
            debug!("Merchant info cache hit");
            return Ok(info);
        }

        let url = self.endpoint("khqr/merchant-info")?;
        let info: MerchantInfo = self.send(self.request(Method::GET, url)).await?;
        self.inner
            .merchant_cache
            .insert(MERCHANT_INFO_KEY, info.clone())
            .await;
        Ok(info)
    }

    #[instrument(skip(self, request), fields(bill_number = %request.bill_number, amount = %request.amount))]
    async fn request_qr(&self, request: &PaymentRequest) -> Result<QrPayload, ApiError> {
        if let Some(qr) = &self.inner.static_qr {
            debug!("Using configured static KHQR code");
            return Ok(QrPayload {
                qr: qr.clone(),
                md5: None,
            });
        }

        let mut url = self.endpoint("khqr/generate")?;
        url.query_pairs_mut()
            .append_pair("amount", &request.amount.round_dp(2).to_string())
            .append_pair("bill_number", request.bill_number.as_str());

        let generated: GeneratedQr = self.send(self.request(Method::POST, url)).await?;
        Ok(QrPayload {
            qr: generated.qr,
            md5: generated.md5,
        })
    }

    #[instrument(skip(self, transaction_id), fields(transaction_id = %transaction_id))]
    async fn verify_payment(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<VerificationResult, ApiError> {
        let mut url = self.endpoint("khqr/verify/")?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Parse("API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(transaction_id.as_str());

        self.send(self.request(Method::POST, url)).await
    }
}
