// SPDX-License-Identifier: Apache-2.0

use crate::ids::ParseError;
use crate::order::InvoiceNumber;
use serde::{Deserialize, Serialize};

/// Pseudo item id used to carry the shipping charge in a gateway request,
/// so item totals always add up to the gross amount.
pub const SHIPPING_ITEM_ID: &str = "SHIPPING";

const AMOUNT_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct PaymentCustomer {
    pub first_name: String,
    pub phone: String,
    pub email: Option<String>,
}

impl PaymentCustomer {
    #[must_use]
    pub fn new(first_name: String, phone: String, email: Option<String>) -> Self {
        Self {
            first_name,
            phone,
            email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct PaymentItem {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

impl PaymentItem {
    #[must_use]
    pub fn new(id: String, name: String, price: f64, quantity: u32) -> Self {
        Self {
            id,
            name,
            price,
            quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct PaymentRequest {
    pub invoice_number: InvoiceNumber,
    pub gross_amount: f64,
    pub customer: PaymentCustomer,
    pub items: Vec<PaymentItem>,
}

impl PaymentRequest {
    #[must_use]
    pub fn new(
        invoice_number: InvoiceNumber,
        gross_amount: f64,
        customer: PaymentCustomer,
        items: Vec<PaymentItem>,
    ) -> Self {
        Self {
            invoice_number,
            gross_amount,
            customer,
            items,
        }
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        if !self.gross_amount.is_finite() || self.gross_amount <= 0.0 {
            return Err(ParseError::OutOfRange("gross_amount must be > 0"));
        }
        if self.items.is_empty() {
            return Err(ParseError::Empty("payment items"));
        }
        let item_sum: f64 = self
            .items
            .iter()
            .map(|i| i.price * f64::from(i.quantity))
            .sum();
        if (item_sum - self.gross_amount).abs() > AMOUNT_EPSILON {
            return Err(ParseError::InvalidFormat(
                "payment items must sum to gross_amount",
            ));
        }
        Ok(())
    }
}
