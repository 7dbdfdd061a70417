// SPDX-License-Identifier: Apache-2.0

use crate::ids::ParseError;
use serde::{Deserialize, Serialize};

pub const CURRENCY_PREFIX_MAX_LEN: usize = 16;
pub const CURRENCY_DECIMAL_PLACES_MAX: usize = 4;

/// Display formatting for monetary amounts, rupiah-style by default.
///
/// `format` and `parse` are inverses for whole amounts: any non-negative
/// integer value survives a format/parse round trip exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct CurrencyFormat {
    pub prefix: String,
    pub thousands_separator: char,
    pub decimal_separator: char,
    pub decimal_places: usize,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            prefix: "Rp. ".to_string(),
            thousands_separator: '.',
            decimal_separator: ',',
            decimal_places: 0,
        }
    }
}

impl CurrencyFormat {
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.prefix.len() > CURRENCY_PREFIX_MAX_LEN {
            return Err(ParseError::TooLong(
                "currency prefix",
                CURRENCY_PREFIX_MAX_LEN,
            ));
        }
        if self.thousands_separator == self.decimal_separator {
            return Err(ParseError::InvalidFormat(
                "currency separators must differ",
            ));
        }
        if self.thousands_separator.is_ascii_digit() || self.decimal_separator.is_ascii_digit() {
            return Err(ParseError::InvalidFormat(
                "currency separators must not be digits",
            ));
        }
        if self.decimal_places > CURRENCY_DECIMAL_PLACES_MAX {
            return Err(ParseError::OutOfRange(
                "currency decimal places must be <= 4",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn format(&self, amount: f64) -> String {
        let negative = amount.is_sign_negative() && amount != 0.0;
        let fixed = format!("{:.*}", self.decimal_places, amount.abs());
        let (whole, frac) = match fixed.split_once('.') {
            Some((w, f)) => (w, Some(f)),
            None => (fixed.as_str(), None),
        };
        let digits = whole.as_bytes();
        let mut out = String::with_capacity(self.prefix.len() + fixed.len() + fixed.len() / 3 + 1);
        out.push_str(&self.prefix);
        if negative {
            out.push('-');
        }
        for (i, b) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(self.thousands_separator);
            }
            out.push(char::from(*b));
        }
        if let Some(frac) = frac {
            out.push(self.decimal_separator);
            out.push_str(frac);
        }
        out
    }

    pub fn parse(&self, input: &str) -> Result<f64, ParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty("amount"));
        }
        let rest = trimmed
            .strip_prefix(self.prefix.as_str())
            .or_else(|| trimmed.strip_prefix(self.prefix.trim_end()))
            .unwrap_or(trimmed)
            .trim_start();
        let (negative, body) = match rest.strip_prefix('-') {
            Some(tail) => (true, tail),
            None => (false, rest),
        };
        let mut normalized = String::with_capacity(body.len());
        for c in body.chars() {
            if c == self.thousands_separator {
                continue;
            }
            if c == self.decimal_separator {
                normalized.push('.');
                continue;
            }
            if c.is_ascii_digit() {
                normalized.push(c);
                continue;
            }
            return Err(ParseError::InvalidFormat(
                "amount contains an unexpected character",
            ));
        }
        if normalized.is_empty() || normalized == "." {
            return Err(ParseError::Empty("amount"));
        }
        let value = normalized
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidFormat("amount is not a number"))?;
        Ok(if negative { -value } else { value })
    }
}
