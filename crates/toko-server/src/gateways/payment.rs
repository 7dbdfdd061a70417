// SPDX-License-Identifier: Apache-2.0

use super::validate_gateway_url;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::time::Duration;
use toko_model::PaymentRequest;
use toko_store::{PaymentGateway, PaymentGatewayError};
use tracing::instrument;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Gateway client for the hosted payment provider.
///
/// Requests are never retried: once a charge request has reached the
/// provider its outcome is unknown, and a duplicate attempt can double
/// charge. Callers see one attempt, pass or fail.
///
/// `create_transaction` blocks and must run on a blocking worker, which
/// is where order placement already executes.
pub struct HttpPaymentGateway {
    base_url: String,
    server_key: String,
    timeout: Duration,
    allow_private_hosts: bool,
}

impl HttpPaymentGateway {
    #[must_use]
    pub fn new(
        base_url: String,
        server_key: String,
        timeout: Duration,
        allow_private_hosts: bool,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            server_key,
            timeout,
            allow_private_hosts,
        }
    }

    fn client(&self) -> reqwest::blocking::Client {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new())
    }

    fn transactions_url(&self) -> String {
        format!("{}/transactions", self.base_url)
    }

    fn auth_header(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:", self.server_key)))
    }

    fn signature(&self, request: &PaymentRequest) -> Result<String, PaymentGatewayError> {
        let mut mac = HmacSha256::new_from_slice(self.server_key.as_bytes())
            .map_err(|e| PaymentGatewayError(format!("signing key rejected: {e}")))?;
        mac.update(request.invoice_number.as_str().as_bytes());
        mac.update(b":");
        mac.update(format!("{}", request.gross_amount).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn request_body(request: &PaymentRequest) -> serde_json::Value {
        let items: Vec<serde_json::Value> = request
            .items
            .iter()
            .map(|item| {
                json!({
                    "id": item.id,
                    "name": item.name,
                    "price": item.price,
                    "quantity": item.quantity,
                })
            })
            .collect();
        json!({
            "transaction_details": {
                "order_id": request.invoice_number.as_str(),
                "gross_amount": request.gross_amount,
            },
            "customer_details": {
                "first_name": request.customer.first_name,
                "phone": request.customer.phone,
                "email": request.customer.email,
            },
            "item_details": items,
        })
    }
}

impl PaymentGateway for HttpPaymentGateway {
    #[instrument(
        name = "payment_create_transaction",
        skip(self, request),
        fields(invoice = %request.invoice_number)
    )]
    fn create_transaction(&self, request: &PaymentRequest) -> Result<String, PaymentGatewayError> {
        let url = self.transactions_url();
        validate_gateway_url(&url, self.allow_private_hosts)
            .map_err(|e| PaymentGatewayError(e.to_string()))?;
        let signature = self.signature(request)?;
        let resp = self
            .client()
            .post(&url)
            .header("authorization", self.auth_header())
            .header("x-signature", signature)
            .json(&Self::request_body(request))
            .send()
            .map_err(|e| PaymentGatewayError(format!("payment request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PaymentGatewayError(format!(
                "payment provider returned status {status}"
            )));
        }
        let parsed: TokenResponse = resp
            .json()
            .map_err(|e| PaymentGatewayError(format!("payment response parse failed: {e}")))?;
        let token = parsed.token.trim();
        if token.is_empty() {
            return Err(PaymentGatewayError(
                "payment provider returned an empty token".to_string(),
            ));
        }
        Ok(token.to_string())
    }
}

/// Used when no payment provider is configured. Manual-transfer checkout
/// never calls the gateway; online checkout gets a gateway error.
pub struct UnconfiguredPaymentGateway;

impl PaymentGateway for UnconfiguredPaymentGateway {
    fn create_transaction(&self, _request: &PaymentRequest) -> Result<String, PaymentGatewayError> {
        Err(PaymentGatewayError(
            "payment provider not configured".to_string(),
        ))
    }
}
