// SPDX-License-Identifier: Apache-2.0

//! Request-side parsing: query filters and JSON bodies.
//!
//! Query maps arrive as `BTreeMap<String, String>` from the router. Every
//! list surface carries an allow list and rejects keys outside it, so a
//! misspelled filter fails the request instead of silently widening the
//! result set.

use crate::errors::ApiError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use toko_model::{
    CategoryId, CityId, OrderDraft, ParseError, PaymentMethod, ProductId, ShippingAddress, StateId,
};

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 200;

pub const ALLOWED_PRODUCT_FILTERS: [&str; 8] = [
    "category",
    "min_price",
    "max_price",
    "q",
    "in_stock",
    "sort",
    "limit",
    "offset",
];
pub const ALLOWED_NAME_FILTERS: [&str; 1] = ["q"];
pub const ALLOWED_CITY_FILTERS: [&str; 1] = ["state"];

/// Sort orders the product list accepts, spelled `field:direction` on the
/// wire. Anything outside this set is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

impl ProductSort {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created_at:desc" => Some(Self::Newest),
            "price:asc" => Some(Self::PriceAsc),
            "price:desc" => Some(Self::PriceDesc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductListParams {
    pub category: Option<CategoryId>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub in_stock_only: bool,
    pub sort: ProductSort,
    pub limit: u32,
    pub offset: u32,
}

pub fn parse_product_list_params(
    query: &BTreeMap<String, String>,
) -> Result<ProductListParams, ApiError> {
    parse_product_list_params_with_limit(query, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT)
}

pub fn parse_product_list_params_with_limit(
    query: &BTreeMap<String, String>,
    default_limit: u32,
    max_limit: u32,
) -> Result<ProductListParams, ApiError> {
    reject_unknown_keys(query, &ALLOWED_PRODUCT_FILTERS)?;

    let category = match query.get("category") {
        Some(raw) => {
            let id = raw
                .parse::<i64>()
                .ok()
                .and_then(|v| CategoryId::new(v).ok())
                .ok_or_else(|| ApiError::invalid_param("category", raw))?;
            Some(id)
        }
        None => None,
    };

    let min_price = parse_price(query, "min_price")?;
    let max_price = parse_price(query, "max_price")?;
    if let (Some(min), Some(max)) = (min_price, max_price) {
        if min > max {
            let raw = query.get("max_price").map(String::as_str).unwrap_or_default();
            return Err(ApiError::invalid_param("max_price", raw));
        }
    }

    let sort = match query.get("sort") {
        Some(raw) => {
            ProductSort::parse(raw).ok_or_else(|| ApiError::invalid_param("sort", raw))?
        }
        None => ProductSort::default(),
    };

    let limit = if let Some(raw) = query.get("limit") {
        let value = raw
            .parse::<u32>()
            .map_err(|_| ApiError::invalid_param("limit", raw))?;
        if value == 0 || value > max_limit {
            return Err(ApiError::invalid_param("limit", raw));
        }
        value
    } else {
        default_limit
    };

    let offset = if let Some(raw) = query.get("offset") {
        raw.parse::<u32>()
            .map_err(|_| ApiError::invalid_param("offset", raw))?
    } else {
        0
    };

    Ok(ProductListParams {
        category,
        min_price,
        max_price,
        search: trimmed_search(query),
        in_stock_only: query
            .get("in_stock")
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        sort,
        limit,
        offset,
    })
}

/// `?q=` for the category and state listings. A blank term means no filter.
pub fn parse_name_search(query: &BTreeMap<String, String>) -> Result<Option<String>, ApiError> {
    reject_unknown_keys(query, &ALLOWED_NAME_FILTERS)?;
    Ok(trimmed_search(query))
}

/// `?state=` for the city listing.
pub fn parse_city_list_params(
    query: &BTreeMap<String, String>,
) -> Result<Option<StateId>, ApiError> {
    reject_unknown_keys(query, &ALLOWED_CITY_FILTERS)?;
    match query.get("state") {
        Some(raw) => {
            let id = raw
                .parse::<i64>()
                .ok()
                .and_then(|v| StateId::new(v).ok())
                .ok_or_else(|| ApiError::invalid_param("state", raw))?;
            Ok(Some(id))
        }
        None => Ok(None),
    }
}

fn reject_unknown_keys(query: &BTreeMap<String, String>, allowed: &[&str]) -> Result<(), ApiError> {
    for key in query.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ApiError::unknown_filter(key, allowed));
        }
    }
    Ok(())
}

fn parse_price(
    query: &BTreeMap<String, String>,
    name: &'static str,
) -> Result<Option<f64>, ApiError> {
    let Some(raw) = query.get(name) else {
        return Ok(None);
    };
    let value = raw
        .parse::<f64>()
        .map_err(|_| ApiError::invalid_param(name, raw))?;
    if !value.is_finite() || value < 0.0 {
        return Err(ApiError::invalid_param(name, raw));
    }
    Ok(Some(value))
}

fn trimmed_search(query: &BTreeMap<String, String>) -> Option<String> {
    query
        .get("q")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn bad_field(field: &'static str, err: &ParseError) -> ApiError {
    ApiError::invalid_field(field, err.to_string())
}

fn decode<T: for<'de> Deserialize<'de>>(body: &Value) -> Result<T, ApiError> {
    serde_json::from_value(body.clone()).map_err(|e| ApiError::malformed_body(&e.to_string()))
}

/// Body of `POST /v1/cart`. Upserts by product: posting a product already
/// in the cart replaces that line's quantity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartForm {
    pub product_id: i64,
    pub quantity: u32,
}

impl CartForm {
    pub fn product_id(&self) -> Result<ProductId, ApiError> {
        ProductId::new(self.product_id).map_err(|e| bad_field("product_id", &e))
    }
}

pub fn parse_cart_form(body: &Value) -> Result<CartForm, ApiError> {
    decode(body)
}

/// Body of `PUT /v1/cart/{id}`. Only the quantity can change; moving a
/// line to another product means deleting and re-adding it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartQuantityForm {
    pub quantity: u32,
}

pub fn parse_cart_quantity_form(body: &Value) -> Result<CartQuantityForm, ApiError> {
    decode(body)
}

/// Body of `POST /v1/shipping/cost`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShippingCostForm {
    pub city_id: i64,
    pub courier: String,
}

impl ShippingCostForm {
    pub fn destination(&self) -> Result<CityId, ApiError> {
        CityId::new(self.city_id).map_err(|e| bad_field("city_id", &e))
    }

    pub fn courier(&self) -> Result<&str, ApiError> {
        let courier = self.courier.trim();
        if courier.is_empty() {
            return Err(ApiError::invalid_field("courier", "must not be blank"));
        }
        Ok(courier)
    }
}

pub fn parse_shipping_cost_form(body: &Value) -> Result<ShippingCostForm, ApiError> {
    decode(body)
}

/// Body of `POST /v1/orders`.
///
/// `total_shipping` is the quoted rate the customer picked; `sub_total` and
/// `total` are never accepted from the caller and are recomputed from the
/// cart at placement. Unknown fields reject the whole body, so a client
/// smuggling its own totals gets a 422 instead of a discount.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderForm {
    pub payment_method: String,
    pub courier: String,
    pub shipping_service: String,
    pub total_shipping: f64,
    pub recipient: String,
    pub phone: String,
    pub state_id: i64,
    pub city_id: i64,
    pub street: String,
    pub postal_code: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl OrderForm {
    pub fn into_draft(self) -> Result<OrderDraft, ApiError> {
        let payment_method = PaymentMethod::parse(&self.payment_method)
            .map_err(|e| bad_field("payment_method", &e))?;
        let state_id = StateId::new(self.state_id).map_err(|e| bad_field("state_id", &e))?;
        let city_id = CityId::new(self.city_id).map_err(|e| bad_field("city_id", &e))?;
        let address = ShippingAddress::new(
            self.recipient,
            self.phone,
            state_id,
            city_id,
            self.street,
            self.postal_code,
        );
        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        let draft = OrderDraft::new(
            payment_method,
            self.courier,
            self.shipping_service,
            self.total_shipping,
            address,
            email,
        );
        draft.validate().map_err(|e| bad_field("order", &e))?;
        Ok(draft)
    }
}

pub fn parse_order_form(body: &Value) -> Result<OrderForm, ApiError> {
    decode(body)
}

/// Body of `PUT /v1/orders/{id}/payment-proof`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentProofForm {
    pub payment_proof: String,
}

impl PaymentProofForm {
    pub fn proof(&self) -> Result<&str, ApiError> {
        let proof = self.payment_proof.trim();
        if proof.is_empty() {
            return Err(ApiError::invalid_field("payment_proof", "must not be blank"));
        }
        Ok(proof)
    }
}

pub fn parse_payment_proof_form(body: &Value) -> Result<PaymentProofForm, ApiError> {
    decode(body)
}
