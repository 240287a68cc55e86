//! Payment gateway client (Zarinpal)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shop_core::Money;

/// Payment initialization request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    pub description: String,
    pub callback_url: String,
}

/// Payment initialization response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    /// Gateway-side identifier for this payment attempt.
    pub authority: String,
    /// Where to send the customer to pay.
    pub redirect_url: String,
}

/// Payment verification response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResponse {
    pub verified: bool,
    pub ref_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
}

/// Payment gateway trait
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn gateway_id(&self) -> &'static str;
    async fn request_payment(&self, request: &PaymentRequest)
        -> Result<PaymentResponse, GatewayError>;
    async fn verify(&self, authority: &str, amount: Money)
        -> Result<VerificationResponse, GatewayError>;
}

// ============== Zarinpal Gateway ==============

pub struct ZarinpalGateway {
    merchant_id: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl ZarinpalGateway {
    pub fn new(merchant_id: String) -> Self {
        Self::with_base_url(merchant_id, "https://payment.zarinpal.com".to_string())
    }

    pub fn with_base_url(merchant_id: String, base_url: String) -> Self {
        Self {
            merchant_id,
            base_url,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for ZarinpalGateway {
    fn gateway_id(&self) -> &'static str {
        "zarinpal"
    }

    async fn request_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentResponse, GatewayError> {
        let payload = json!({
            "merchant_id": self.merchant_id,
            "amount": request.amount,
            "description": request.description,
            "callback_url": request.callback_url,
        });

        let response = self
            .http_client
            .post(format!("{}/pg/v4/payment/request.json", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Api(e.to_string()))?;

        if result["data"]["code"].as_i64() != Some(100) {
            return Err(GatewayError::Api(
                result["errors"]["message"]
                    .as_str()
                    .unwrap_or("Unknown error")
                    .to_string(),
            ));
        }

        let authority = result["data"]["authority"].as_str().unwrap_or("").to_string();
        let redirect_url = format!("{}/pg/StartPay/{}", self.base_url, authority);

        Ok(PaymentResponse {
            authority,
            redirect_url,
        })
    }

    async fn verify(
        &self,
        authority: &str,
        amount: Money,
    ) -> Result<VerificationResponse, GatewayError> {
        let payload = json!({
            "merchant_id": self.merchant_id,
            "amount": amount,
            "authority": authority,
        });

        let response = self
            .http_client
            .post(format!("{}/pg/v4/payment/verify.json", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Api(e.to_string()))?;

        let code = result["data"]["code"].as_i64();
        // 100 = verified, 101 = already verified
        let verified = matches!(code, Some(100) | Some(101));

        Ok(VerificationResponse {
            verified,
            ref_id: result["data"]["ref_id"]
                .as_i64()
                .map(|id| id.to_string()),
        })
    }
}
