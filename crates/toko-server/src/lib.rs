// SPDX-License-Identifier: Apache-2.0
#![forbid(unsafe_code)]

use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use toko_api::{
    parse_cart_form, parse_cart_quantity_form, parse_city_list_params, parse_name_search,
    parse_order_form, parse_payment_proof_form, parse_product_list_params_with_limit,
    parse_shipping_cost_form, ApiError,
    ApiErrorCode, ApiResponseEnvelope, CartDto, CartLineDto, CategoryDto, CityDto, OrderDetailDto,
    OrderDto, OrderLineDto, ProductCardDto, ProductDto, ProductSort, RateOptionDto, StateDto,
    DEFAULT_PAGE_LIMIT,
};
use toko_model::{chargeable_weight_kg, CartLineId, CurrencyFormat, OrderId, ProductId, RateQuery, UserId};
use toko_store::{PaymentGateway, ProductFilter, ProductOrder, Store, StoreError, StoreErrorCode};
use tracing::{error, info, warn};

mod config;
mod gateways;
mod http_handlers;
mod outbox;
mod telemetry;

pub const CRATE_NAME: &str = "toko-server";

pub use config::{
    validate_startup_config, PaymentConfig, ServerConfig, ShippingConfig, CONFIG_SCHEMA_VERSION,
};
pub use gateways::payment::{HttpPaymentGateway, UnconfiguredPaymentGateway};
pub use gateways::shipping::{HttpShippingGateway, ShippingGateway, StaticShippingGateway};
pub use gateways::GatewayError;
pub use outbox::{drain_pending, spawn_outbox_worker, LogNotifier, Notifier};

use telemetry::RequestMetrics;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub shipping: Arc<dyn ShippingGateway>,
    pub payment: Arc<dyn PaymentGateway>,
    pub config: ServerConfig,
    pub money: CurrencyFormat,
    pub ready: Arc<AtomicBool>,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<Store>,
        shipping: Arc<dyn ShippingGateway>,
        payment: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self::with_config(store, shipping, payment, ServerConfig::default())
    }

    #[must_use]
    pub fn with_config(
        store: Arc<Store>,
        shipping: Arc<dyn ShippingGateway>,
        payment: Arc<dyn PaymentGateway>,
        config: ServerConfig,
    ) -> Self {
        Self {
            store,
            shipping,
            payment,
            config,
            money: CurrencyFormat::default(),
            ready: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

/// Maps a store failure onto the wire error envelope. Client-caused codes
/// keep the store's message; infrastructure codes collapse to a generic
/// internal error so connection strings and SQL never leak.
pub(crate) fn api_error_for_store(err: &StoreError) -> ApiError {
    match err.code {
        StoreErrorCode::NotFound => {
            ApiError::new(ApiErrorCode::NotFound, err.message.clone(), json!({}))
        }
        StoreErrorCode::Validation => {
            ApiError::new(ApiErrorCode::ValidationFailed, err.message.clone(), json!({}))
        }
        StoreErrorCode::EmptyCart => ApiError::empty_cart(),
        StoreErrorCode::InsufficientStock => {
            ApiError::new(ApiErrorCode::InsufficientStock, err.message.clone(), json!({}))
        }
        StoreErrorCode::Conflict => {
            ApiError::new(ApiErrorCode::Conflict, err.message.clone(), json!({}))
        }
        StoreErrorCode::PaymentGateway => ApiError::payment_gateway_failed(),
        _ => ApiError::internal(),
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http_handlers::healthz_handler))
        .route("/readyz", get(http_handlers::readyz_handler))
        .route("/metrics", get(http_handlers::metrics_handler))
        .route("/v1/version", get(http_handlers::version_handler))
        .route("/v1/categories", get(http_handlers::categories_handler))
        .route("/v1/products", get(http_handlers::products_handler))
        .route(
            "/v1/products/:id",
            get(http_handlers::product_detail_handler),
        )
        .route("/v1/states", get(http_handlers::states_handler))
        .route("/v1/cities", get(http_handlers::cities_handler))
        .route(
            "/v1/cart",
            get(http_handlers::cart_list_handler).post(http_handlers::cart_upsert_handler),
        )
        .route(
            "/v1/cart/:id",
            put(http_handlers::cart_update_handler).delete(http_handlers::cart_delete_handler),
        )
        .route(
            "/v1/shipping/cost",
            post(http_handlers::shipping_cost_handler),
        )
        .route(
            "/v1/orders",
            get(http_handlers::orders_list_handler).post(http_handlers::order_create_handler),
        )
        .route("/v1/orders/:id", get(http_handlers::order_detail_handler))
        .route(
            "/v1/orders/:id/payment-proof",
            put(http_handlers::payment_proof_handler),
        )
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}

#[cfg(test)]
mod store_error_mapping_tests {
    use super::*;

    #[test]
    fn client_codes_keep_the_store_message() {
        let err = StoreError::new(StoreErrorCode::NotFound, "product 99 not found");
        let api = api_error_for_store(&err);
        assert_eq!(api.code, ApiErrorCode::NotFound);
        assert_eq!(api.message, "product 99 not found");

        let err = StoreError::new(StoreErrorCode::InsufficientStock, "only 2 left");
        let api = api_error_for_store(&err);
        assert_eq!(api.code, ApiErrorCode::InsufficientStock);
        assert_eq!(api.code.http_status(), 409);
    }

    #[test]
    fn empty_cart_uses_the_storefront_wording() {
        let err = StoreError::new(StoreErrorCode::EmptyCart, "cart has no lines");
        let api = api_error_for_store(&err);
        assert_eq!(api.code, ApiErrorCode::EmptyCart);
        assert_eq!(api.message, "Your cart is empty.");
        assert_eq!(api.code.http_status(), 422);
    }

    #[test]
    fn infrastructure_codes_never_leak_detail() {
        let err = StoreError::new(StoreErrorCode::Io, "disk I/O error at /var/db/toko.db");
        let api = api_error_for_store(&err);
        assert_eq!(api.code, ApiErrorCode::Internal);
        assert!(!api.message.contains("/var/db"));

        let err = StoreError::new(StoreErrorCode::PaymentGateway, "provider said 503");
        let api = api_error_for_store(&err);
        assert_eq!(api.code, ApiErrorCode::PaymentGatewayFailed);
        assert_eq!(api.code.http_status(), 502);
        assert!(!api.message.contains("503"));
    }
}
