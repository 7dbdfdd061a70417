// SPDX-License-Identifier: Apache-2.0

use crate::ids::{CartLineId, ParseError, ProductId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub fn new(id: CartLineId, user_id: UserId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            id,
            user_id,
            product_id,
            quantity,
        }
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        if self.quantity == 0 {
            return Err(ParseError::OutOfRange("cart quantity must be >= 1"));
        }
        Ok(())
    }
}

/// Aggregate view of one user's cart: payable amount and line count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct CartTotals {
    pub amount: f64,
    pub item_count: u64,
}

impl CartTotals {
    pub fn add_line(&mut self, quantity: u32, unit_price: f64) {
        self.amount += f64::from(quantity) * unit_price;
        self.item_count += 1;
    }
}
