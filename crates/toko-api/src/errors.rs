// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ApiErrorCode {
    ValidationFailed,
    EmptyCart,
    InsufficientStock,
    PaymentGatewayFailed,
    NotFound,
    Unauthorized,
    Conflict,
    Internal,
}

impl ApiErrorCode {
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::ValidationFailed | Self::EmptyCart => 422,
            Self::InsufficientStock | Self::Conflict => 409,
            Self::PaymentGatewayFailed => 502,
            Self::NotFound => 404,
            Self::Unauthorized => 401,
            Self::Internal => 500,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationFailed => "validation_failed",
            Self::EmptyCart => "empty_cart",
            Self::InsufficientStock => "insufficient_stock",
            Self::PaymentGatewayFailed => "payment_gateway_failed",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

/// Wire error: every non-2xx response carries one of these under an
/// `{"error": ...}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn invalid_param(name: &str, value: &str) -> Self {
        Self::new(
            ApiErrorCode::ValidationFailed,
            format!("invalid query parameter: {name}"),
            json!({"field_errors":[{"parameter": name, "reason": "invalid", "value": value}]}),
        )
    }

    #[must_use]
    pub fn unknown_filter(name: &str, allowed: &[&str]) -> Self {
        Self::new(
            ApiErrorCode::ValidationFailed,
            format!("unknown filter: {name}"),
            json!({"field_errors":[{
                "parameter": name,
                "reason": "unknown",
                "value": format!("allowed: {}", allowed.join(", ")),
            }]}),
        )
    }

    #[must_use]
    pub fn validation_failed(field_errors: Value) -> Self {
        Self::new(
            ApiErrorCode::ValidationFailed,
            "validation failed",
            json!({"field_errors": field_errors}),
        )
    }

    #[must_use]
    pub fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        Self::validation_failed(json!([{"field": field, "reason": reason.into()}]))
    }

    #[must_use]
    pub fn malformed_body(reason: &str) -> Self {
        Self::new(
            ApiErrorCode::ValidationFailed,
            "request body rejected",
            json!({"field_errors":[{"field": "body", "reason": reason}]}),
        )
    }

    #[must_use]
    pub fn empty_cart() -> Self {
        Self::new(ApiErrorCode::EmptyCart, "Your cart is empty.", json!({}))
    }

    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::new(ApiErrorCode::NotFound, format!("{what} not found"), json!({}))
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(
            ApiErrorCode::Unauthorized,
            "missing or invalid x-user-id header",
            json!({}),
        )
    }

    /// Payment failures surface a generic retry message; the upstream
    /// detail stays in the server logs.
    #[must_use]
    pub fn payment_gateway_failed() -> Self {
        Self::new(
            ApiErrorCode::PaymentGatewayFailed,
            "payment could not be authorized, please try again",
            json!({}),
        )
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(ApiErrorCode::Internal, "internal error", json!({}))
    }

    #[must_use]
    pub fn envelope(&self) -> Value {
        json!({"error": self})
    }
}

const _: fn() = || {
    fn assert_traits<T: Serialize + for<'de> Deserialize<'de>>() {}
    assert_traits::<ApiErrorCode>();
    assert_traits::<ApiError>();
};
