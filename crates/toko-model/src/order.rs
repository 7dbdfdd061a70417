// SPDX-License-Identifier: Apache-2.0

use crate::ids::{CityId, OrderId, ParseError, ProductId, StateId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const INVOICE_PREFIX: &str = "INV";
pub const INVOICE_PAD_WIDTH: usize = 5;
pub const COURIER_MAX_LEN: usize = 32;
pub const SERVICE_MAX_LEN: usize = 64;
pub const RECIPIENT_MAX_LEN: usize = 200;
pub const PHONE_MAX_LEN: usize = 20;
pub const STREET_MAX_LEN: usize = 500;
pub const POSTAL_CODE_MAX_LEN: usize = 10;

const AMOUNT_EPSILON: f64 = 1e-6;

/// Invoice identifier derived from the order id: `INV` plus the id
/// zero-padded to five digits. Ids past 99999 keep all their digits, so
/// uniqueness follows from order id uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    #[must_use]
    pub fn from_order_id(id: OrderId) -> Self {
        Self(format!(
            "{INVOICE_PREFIX}{:0width$}",
            id.get(),
            width = INVOICE_PAD_WIDTH
        ))
    }

    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let digits = input
            .strip_prefix(INVOICE_PREFIX)
            .ok_or(ParseError::InvalidFormat(
                "invoice number must start with INV",
            ))?;
        if digits.len() < INVOICE_PAD_WIDTH {
            return Err(ParseError::InvalidFormat(
                "invoice number must carry at least five digits",
            ));
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseError::InvalidFormat(
                "invoice number digits must be numeric",
            ));
        }
        Ok(Self(input.to_string()))
    }

    pub fn order_id(&self) -> Result<OrderId, ParseError> {
        let digits = &self.0[INVOICE_PREFIX.len()..];
        let raw = digits
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidFormat("invoice number digits overflow"))?;
        OrderId::new(raw)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for InvoiceNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum PaymentMethod {
    ManualTransfer,
    OnlineGateway,
}

impl PaymentMethod {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "manual_transfer" => Ok(Self::ManualTransfer),
            "online_gateway" => Ok(Self::OnlineGateway),
            _ => Err(ParseError::InvalidFormat(
                "payment method must be 'manual_transfer' or 'online_gateway'",
            )),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManualTransfer => "manual_transfer",
            Self::OnlineGateway => "online_gateway",
        }
    }
}

/// Lifecycle of an order. The integer codes are the persisted layout and
/// must stay stable for external reporting tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub fn from_code(code: i64) -> Result<Self, ParseError> {
        match code {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Paid),
            2 => Ok(Self::Shipped),
            3 => Ok(Self::Completed),
            4 => Ok(Self::Canceled),
            _ => Err(ParseError::OutOfRange("order status code must be in 0..=4")),
        }
    }

    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::Paid => 1,
            Self::Shipped => 2,
            Self::Completed => 3,
            Self::Canceled => 4,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }
}

/// A non-empty tracking number forces `Shipped`; this is applied on every
/// order save so a stored tracking number can never coexist with an
/// earlier status.
#[must_use]
pub fn status_with_tracking(status: OrderStatus, tracking_number: Option<&str>) -> OrderStatus {
    match tracking_number {
        Some(t) if !t.trim().is_empty() => OrderStatus::Shipped,
        _ => status,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct ShippingAddress {
    pub recipient: String,
    pub phone: String,
    pub state_id: StateId,
    pub city_id: CityId,
    pub street: String,
    pub postal_code: String,
}

impl ShippingAddress {
    #[must_use]
    pub fn new(
        recipient: String,
        phone: String,
        state_id: StateId,
        city_id: CityId,
        street: String,
        postal_code: String,
    ) -> Self {
        Self {
            recipient,
            phone,
            state_id,
            city_id,
            street,
            postal_code,
        }
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        if self.recipient.trim().is_empty() {
            return Err(ParseError::Empty("recipient"));
        }
        if self.recipient.len() > RECIPIENT_MAX_LEN {
            return Err(ParseError::TooLong("recipient", RECIPIENT_MAX_LEN));
        }
        if self.phone.trim().is_empty() {
            return Err(ParseError::Empty("phone"));
        }
        if self.phone.len() > PHONE_MAX_LEN {
            return Err(ParseError::TooLong("phone", PHONE_MAX_LEN));
        }
        if !self
            .phone
            .chars()
            .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ')
        {
            return Err(ParseError::InvalidFormat(
                "phone must contain only digits, '+', '-', or spaces",
            ));
        }
        if self.street.trim().is_empty() {
            return Err(ParseError::Empty("street"));
        }
        if self.street.len() > STREET_MAX_LEN {
            return Err(ParseError::TooLong("street", STREET_MAX_LEN));
        }
        if self.postal_code.trim().is_empty() {
            return Err(ParseError::Empty("postal_code"));
        }
        if self.postal_code.len() > POSTAL_CODE_MAX_LEN {
            return Err(ParseError::TooLong("postal_code", POSTAL_CODE_MAX_LEN));
        }
        if !self.postal_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ParseError::InvalidFormat("postal_code must be numeric"));
        }
        Ok(())
    }
}

/// Checkout input. Totals are never part of the draft: the subtotal comes
/// from current product prices at placement time and only the shipping
/// charge is caller-supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct OrderDraft {
    pub payment_method: PaymentMethod,
    pub courier: String,
    pub shipping_service: String,
    pub total_shipping: f64,
    pub address: ShippingAddress,
    pub email: Option<String>,
}

impl OrderDraft {
    #[must_use]
    pub fn new(
        payment_method: PaymentMethod,
        courier: String,
        shipping_service: String,
        total_shipping: f64,
        address: ShippingAddress,
        email: Option<String>,
    ) -> Self {
        Self {
            payment_method,
            courier,
            shipping_service,
            total_shipping,
            address,
            email,
        }
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        if self.courier.trim().is_empty() {
            return Err(ParseError::Empty("courier"));
        }
        if self.courier.len() > COURIER_MAX_LEN {
            return Err(ParseError::TooLong("courier", COURIER_MAX_LEN));
        }
        if self.shipping_service.trim().is_empty() {
            return Err(ParseError::Empty("shipping_service"));
        }
        if self.shipping_service.len() > SERVICE_MAX_LEN {
            return Err(ParseError::TooLong("shipping_service", SERVICE_MAX_LEN));
        }
        if !self.total_shipping.is_finite() || self.total_shipping < 0.0 {
            return Err(ParseError::OutOfRange("total_shipping must be >= 0"));
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(ParseError::InvalidFormat("email must contain '@'"));
            }
        }
        self.address.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub invoice_number: InvoiceNumber,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub courier: String,
    pub shipping_service: String,
    pub address: ShippingAddress,
    pub sub_total: f64,
    pub total_shipping: f64,
    pub total: f64,
    pub payment_token: Option<String>,
    pub tracking_number: Option<String>,
    pub payment_proof: Option<String>,
    pub created_at: i64,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        id: OrderId,
        user_id: UserId,
        invoice_number: InvoiceNumber,
        payment_method: PaymentMethod,
        status: OrderStatus,
        courier: String,
        shipping_service: String,
        address: ShippingAddress,
        sub_total: f64,
        total_shipping: f64,
        total: f64,
        payment_token: Option<String>,
        tracking_number: Option<String>,
        payment_proof: Option<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            user_id,
            invoice_number,
            payment_method,
            status,
            courier,
            shipping_service,
            address,
            sub_total,
            total_shipping,
            total,
            payment_token,
            tracking_number,
            payment_proof,
            created_at,
        }
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        if !self.sub_total.is_finite() || self.sub_total < 0.0 {
            return Err(ParseError::OutOfRange("sub_total must be >= 0"));
        }
        if !self.total_shipping.is_finite() || self.total_shipping < 0.0 {
            return Err(ParseError::OutOfRange("total_shipping must be >= 0"));
        }
        if (self.total - (self.sub_total + self.total_shipping)).abs() > AMOUNT_EPSILON {
            return Err(ParseError::InvalidFormat(
                "total must equal sub_total + total_shipping",
            ));
        }
        if self.status != status_with_tracking(self.status, self.tracking_number.as_deref()) {
            return Err(ParseError::InvalidFormat(
                "an order with a tracking number must be shipped",
            ));
        }
        self.address.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct OrderLine {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub unit_weight_kg: f64,
    pub total: f64,
}

impl OrderLine {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        id: i64,
        order_id: OrderId,
        product_id: ProductId,
        product_name: String,
        quantity: u32,
        unit_price: f64,
        unit_weight_kg: f64,
        total: f64,
    ) -> Self {
        Self {
            id,
            order_id,
            product_id,
            product_name,
            quantity,
            unit_price,
            unit_weight_kg,
            total,
        }
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        if self.quantity == 0 {
            return Err(ParseError::OutOfRange("order line quantity must be >= 1"));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(ParseError::OutOfRange("order line unit_price must be >= 0"));
        }
        if (self.total - f64::from(self.quantity) * self.unit_price).abs() > AMOUNT_EPSILON {
            return Err(ParseError::InvalidFormat(
                "order line total must equal quantity * unit_price",
            ));
        }
        Ok(())
    }
}
