// SPDX-License-Identifier: Apache-2.0

use super::{validate_gateway_url, GatewayError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use toko_model::{RateOption, RateQuery};
use tracing::{instrument, warn};

/// Total attempts for one quote. Rate lookup is read-only, so a duplicate
/// request after a transport failure is harmless.
const RATE_ATTEMPTS: u32 = 2;

/// Courier rate lookup.
///
/// A non-success upstream status means "no rates for this route" and maps
/// to an empty list. Only transport failures surface as errors, and it is
/// the caller's decision whether to degrade those as well.
#[async_trait]
pub trait ShippingGateway: Send + Sync {
    async fn rates(&self, query: &RateQuery) -> Result<Vec<RateOption>, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct RateCostValue {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct RateCost {
    service: String,
    #[serde(default)]
    description: String,
    cost: Vec<RateCostValue>,
}

#[derive(Debug, Deserialize)]
struct RateResult {
    #[serde(default)]
    costs: Vec<RateCost>,
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    #[serde(default)]
    results: Vec<RateResult>,
}

fn options_from_response(parsed: RateResponse) -> Vec<RateOption> {
    parsed
        .results
        .into_iter()
        .flat_map(|result| result.costs)
        .filter_map(|cost| {
            let value = cost.cost.first()?.value;
            if !value.is_finite() || value < 0.0 {
                return None;
            }
            Some(RateOption::new(cost.service, cost.description, value))
        })
        .collect()
}

pub struct HttpShippingGateway {
    base_url: String,
    api_key: String,
    timeout: Duration,
    retry_backoff: Duration,
    allow_private_hosts: bool,
}

impl HttpShippingGateway {
    #[must_use]
    pub fn new(
        base_url: String,
        api_key: String,
        timeout: Duration,
        retry_backoff: Duration,
        allow_private_hosts: bool,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            retry_backoff,
            allow_private_hosts,
        }
    }

    fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    }

    fn cost_url(&self) -> String {
        format!("{}/cost", self.base_url)
    }
}

#[async_trait]
impl ShippingGateway for HttpShippingGateway {
    #[instrument(name = "shipping_rates", skip(self, query), fields(courier = %query.courier))]
    async fn rates(&self, query: &RateQuery) -> Result<Vec<RateOption>, GatewayError> {
        let url = self.cost_url();
        validate_gateway_url(&url, self.allow_private_hosts)?;
        let client = self.client();
        let form = [
            ("origin", query.origin_city.get().to_string()),
            ("destination", query.destination_city.get().to_string()),
            ("weight", query.weight_kg.to_string()),
            ("courier", query.courier.clone()),
        ];
        let mut attempt = 0;
        loop {
            attempt += 1;
            let req = client.post(&url).header("key", &self.api_key).form(&form);
            match req.send().await {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: RateResponse = resp
                        .json()
                        .await
                        .map_err(|e| GatewayError(format!("rate response parse failed: {e}")))?;
                    return Ok(options_from_response(parsed));
                }
                Ok(resp) => {
                    warn!(status = %resp.status(), "shipping provider returned no rates");
                    return Ok(Vec::new());
                }
                Err(e) => {
                    if attempt >= RATE_ATTEMPTS {
                        return Err(GatewayError(format!("rate lookup failed: {e}")));
                    }
                    warn!(attempt, "shipping rate attempt failed: {e}");
                }
            }
            tokio::time::sleep(self.retry_backoff.saturating_mul(attempt)).await;
        }
    }
}

/// Canned gateway for tests and for running without a configured provider.
pub struct StaticShippingGateway {
    options: Vec<RateOption>,
    unavailable: bool,
}

impl StaticShippingGateway {
    #[must_use]
    pub fn with_options(options: Vec<RateOption>) -> Self {
        Self {
            options,
            unavailable: false,
        }
    }

    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            options: Vec::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl ShippingGateway for StaticShippingGateway {
    async fn rates(&self, _query: &RateQuery) -> Result<Vec<RateOption>, GatewayError> {
        if self.unavailable {
            return Err(GatewayError("shipping gateway unavailable".to_string()));
        }
        Ok(self.options.clone())
    }
}
