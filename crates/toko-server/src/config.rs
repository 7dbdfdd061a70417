// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;
use toko_api::MAX_PAGE_LIMIT;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

/// Rate-lookup provider settings. With no base URL configured every quote
/// degrades to "no options", which keeps checkout usable for manual
/// transfers in a dev environment.
#[derive(Debug, Clone)]
pub struct ShippingConfig {
    pub base_url: Option<String>,
    pub api_key: String,
    pub timeout: Duration,
    pub retry_backoff: Duration,
    pub allow_private_hosts: bool,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: String::new(),
            timeout: Duration::from_secs(5),
            retry_backoff: Duration::from_millis(250),
            allow_private_hosts: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub base_url: Option<String>,
    pub server_key: String,
    pub timeout: Duration,
    pub allow_private_hosts: bool,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            server_key: String::new(),
            timeout: Duration::from_secs(10),
            allow_private_hosts: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_body_bytes: usize,
    pub max_page_limit: u32,
    pub request_timeout: Duration,
    pub outbox_drain_interval: Duration,
    pub outbox_batch_size: usize,
    pub outbox_max_attempts: u32,
    pub shipping: ShippingConfig,
    pub payment: PaymentConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024,
            max_page_limit: MAX_PAGE_LIMIT,
            request_timeout: Duration::from_secs(10),
            outbox_drain_interval: Duration::from_secs(2),
            outbox_batch_size: 16,
            outbox_max_attempts: 5,
            shipping: ShippingConfig::default(),
            payment: PaymentConfig::default(),
        }
    }
}

pub fn validate_startup_config(cfg: &ServerConfig) -> Result<(), String> {
    if cfg.max_body_bytes == 0 {
        return Err("max_body_bytes must be > 0".to_string());
    }
    if cfg.max_page_limit == 0 {
        return Err("max_page_limit must be > 0".to_string());
    }
    if cfg.request_timeout.is_zero() {
        return Err("request_timeout must be > 0".to_string());
    }
    if cfg.outbox_batch_size == 0 || cfg.outbox_max_attempts == 0 {
        return Err("outbox batch size and max attempts must be > 0".to_string());
    }
    if cfg.shipping.timeout.is_zero() || cfg.payment.timeout.is_zero() {
        return Err("gateway timeouts must be > 0".to_string());
    }
    if cfg.payment.base_url.is_some() && cfg.payment.server_key.trim().is_empty() {
        return Err("payment base_url requires a non-empty server key".to_string());
    }
    Ok(())
}
