// SPDX-License-Identifier: Apache-2.0

use crate::ids::{CategoryId, CityId, ParseError, ProductId, StateId};
use serde::{Deserialize, Serialize};

pub const NAME_MAX_LEN: usize = 200;
pub const SLUG_MAX_LEN: usize = 200;
pub const DESCRIPTION_MAX_LEN: usize = 4000;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct Slug(String);

impl Slug {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        if input.is_empty() {
            return Err(ParseError::Empty("slug"));
        }
        if input.trim() != input {
            return Err(ParseError::Trimmed("slug"));
        }
        if input.len() > SLUG_MAX_LEN {
            return Err(ParseError::TooLong("slug", SLUG_MAX_LEN));
        }
        if !input
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ParseError::InvalidFormat("slug must match [a-z0-9-]+"));
        }
        if input.starts_with('-') || input.ends_with('-') || input.contains("--") {
            return Err(ParseError::InvalidFormat(
                "slug must not start/end with '-' or contain '--'",
            ));
        }
        Ok(Self(input.to_string()))
    }

    pub fn from_name(name: &str) -> Result<Self, ParseError> {
        let mut out = String::with_capacity(name.len());
        let mut last_dash = true;
        for c in name.trim().chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                out.push('-');
                last_dash = true;
            }
        }
        while out.ends_with('-') {
            out.pop();
        }
        Self::parse(&out)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    #[must_use]
    pub fn new(id: CategoryId, name: String) -> Self {
        Self { id, name }
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        validate_name("category name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct State {
    pub id: StateId,
    pub name: String,
}

impl State {
    #[must_use]
    pub fn new(id: StateId, name: String) -> Self {
        Self { id, name }
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        validate_name("state name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct City {
    pub id: CityId,
    pub state_id: StateId,
    pub name: String,
}

impl City {
    #[must_use]
    pub fn new(id: CityId, state_id: StateId, name: String) -> Self {
        Self { id, state_id, name }
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        validate_name("city name", &self.name)
    }
}

/// The single seller profile behind the storefront. Its city is the origin
/// for every shipping rate quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct Shop {
    pub name: String,
    pub owner: String,
    pub email: String,
    pub phone: String,
    pub state_id: StateId,
    pub city_id: CityId,
    pub address: String,
}

impl Shop {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        name: String,
        owner: String,
        email: String,
        phone: String,
        state_id: StateId,
        city_id: CityId,
        address: String,
    ) -> Self {
        Self {
            name,
            owner,
            email,
            phone,
            state_id,
            city_id,
            address,
        }
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        validate_name("shop name", &self.name)?;
        validate_name("shop owner", &self.owner)?;
        if !self.email.contains('@') {
            return Err(ParseError::InvalidFormat("shop email must contain '@'"));
        }
        if self.phone.is_empty() {
            return Err(ParseError::Empty("shop phone"));
        }
        if self.address.is_empty() {
            return Err(ParseError::Empty("shop address"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub image: Option<String>,
    pub price: f64,
    pub weight_kg: f64,
    pub stock: u32,
    pub category_ids: Vec<CategoryId>,
    pub created_at: i64,
}

impl Product {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        id: ProductId,
        name: String,
        slug: Slug,
        description: String,
        image: Option<String>,
        price: f64,
        weight_kg: f64,
        stock: u32,
        category_ids: Vec<CategoryId>,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            name,
            slug,
            description,
            image,
            price,
            weight_kg,
            stock,
            category_ids,
            created_at,
        }
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        validate_name("product name", &self.name)?;
        if self.description.len() > DESCRIPTION_MAX_LEN {
            return Err(ParseError::TooLong(
                "product description",
                DESCRIPTION_MAX_LEN,
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ParseError::OutOfRange("product price must be >= 0"));
        }
        if !self.weight_kg.is_finite() || self.weight_kg <= 0.0 {
            return Err(ParseError::OutOfRange("product weight must be > 0"));
        }
        Ok(())
    }

    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

fn validate_name(field: &'static str, value: &str) -> Result<(), ParseError> {
    if value.is_empty() {
        return Err(ParseError::Empty(field));
    }
    if value.trim() != value {
        return Err(ParseError::Trimmed(field));
    }
    if value.len() > NAME_MAX_LEN {
        return Err(ParseError::TooLong(field, NAME_MAX_LEN));
    }
    Ok(())
}
