// SPDX-License-Identifier: Apache-2.0

//! Response shapes. Monetary fields always travel twice: the raw amount for
//! clients that compute, and a `*_display` string rendered through
//! [`CurrencyFormat`] for clients that only print.

use serde::{Deserialize, Serialize};
use toko_model::{
    CartLine, CartTotals, Category, City, CurrencyFormat, Order, OrderLine, Product, RateOption,
    ShippingAddress, State,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryDto {
    pub id: i64,
    pub name: String,
}

impl CategoryDto {
    #[must_use]
    pub fn from_model(category: &Category) -> Self {
        Self {
            id: category.id.get(),
            name: category.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateDto {
    pub id: i64,
    pub name: String,
}

impl StateDto {
    #[must_use]
    pub fn from_model(state: &State) -> Self {
        Self {
            id: state.id.get(),
            name: state.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CityDto {
    pub id: i64,
    pub state_id: i64,
    pub name: String,
}

impl CityDto {
    #[must_use]
    pub fn from_model(city: &City) -> Self {
        Self {
            id: city.id.get(),
            state_id: city.state_id.get(),
            name: city.name.clone(),
        }
    }
}

/// List-page rendition of a product. The detail rendition
/// ([`ProductDto`]) adds the description and shelf data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductCardDto {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub price: f64,
    pub price_display: String,
    pub in_stock: bool,
}

impl ProductCardDto {
    #[must_use]
    pub fn from_model(product: &Product, money: &CurrencyFormat) -> Self {
        Self {
            id: product.id.get(),
            name: product.name.clone(),
            slug: product.slug.as_str().to_string(),
            image: product.image.clone(),
            price: product.price,
            price_display: money.format(product.price),
            in_stock: product.in_stock(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductDto {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
    pub price: f64,
    pub price_display: String,
    pub weight_kg: f64,
    pub stock: u32,
    pub in_stock: bool,
    pub category_ids: Vec<i64>,
    pub created_at: i64,
}

impl ProductDto {
    #[must_use]
    pub fn from_model(product: &Product, money: &CurrencyFormat) -> Self {
        Self {
            id: product.id.get(),
            name: product.name.clone(),
            slug: product.slug.as_str().to_string(),
            description: product.description.clone(),
            image: product.image.clone(),
            price: product.price,
            price_display: money.format(product.price),
            weight_kg: product.weight_kg,
            stock: product.stock,
            in_stock: product.in_stock(),
            category_ids: product.category_ids.iter().map(|id| id.get()).collect(),
            created_at: product.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartLineDto {
    pub id: i64,
    pub product: ProductCardDto,
    pub quantity: u32,
    pub line_total: f64,
    pub line_total_display: String,
}

impl CartLineDto {
    #[must_use]
    pub fn from_model(line: &CartLine, product: &Product, money: &CurrencyFormat) -> Self {
        let line_total = f64::from(line.quantity) * product.price;
        Self {
            id: line.id.get(),
            product: ProductCardDto::from_model(product, money),
            quantity: line.quantity,
            line_total,
            line_total_display: money.format(line_total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartMetaDto {
    pub total_amount: f64,
    pub total_display: String,
    pub item_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartDto {
    pub lines: Vec<CartLineDto>,
    pub meta: CartMetaDto,
}

impl CartDto {
    #[must_use]
    pub fn from_parts(lines: Vec<CartLineDto>, totals: &CartTotals, money: &CurrencyFormat) -> Self {
        Self {
            lines,
            meta: CartMetaDto {
                total_amount: totals.amount,
                total_display: money.format(totals.amount),
                item_count: totals.item_count,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateOptionDto {
    pub service: String,
    pub description: String,
    pub cost: f64,
    pub cost_display: String,
}

impl RateOptionDto {
    #[must_use]
    pub fn from_model(option: &RateOption, money: &CurrencyFormat) -> Self {
        Self {
            service: option.service.clone(),
            description: option.description.clone(),
            cost: option.cost,
            cost_display: money.format(option.cost),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressDto {
    pub recipient: String,
    pub phone: String,
    pub state_id: i64,
    pub city_id: i64,
    pub street: String,
    pub postal_code: String,
}

impl AddressDto {
    #[must_use]
    pub fn from_model(address: &ShippingAddress) -> Self {
        Self {
            recipient: address.recipient.clone(),
            phone: address.phone.clone(),
            state_id: address.state_id.get(),
            city_id: address.city_id.get(),
            street: address.street.clone(),
            postal_code: address.postal_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderLineDto {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub unit_price_display: String,
    pub total: f64,
    pub total_display: String,
}

impl OrderLineDto {
    #[must_use]
    pub fn from_model(line: &OrderLine, money: &CurrencyFormat) -> Self {
        Self {
            product_id: line.product_id.get(),
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            unit_price_display: money.format(line.unit_price),
            total: line.total,
            total_display: money.format(line.total),
        }
    }
}

/// Status travels both as the stable integer code and as a lowercase name,
/// so reporting clients keep their integers and humans keep their words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderDto {
    pub id: i64,
    pub invoice_number: String,
    pub payment_method: String,
    pub status: String,
    pub status_code: i64,
    pub courier: String,
    pub shipping_service: String,
    pub address: AddressDto,
    pub sub_total: f64,
    pub sub_total_display: String,
    pub total_shipping: f64,
    pub total_shipping_display: String,
    pub total: f64,
    pub total_display: String,
    pub payment_token: Option<String>,
    pub tracking_number: Option<String>,
    pub payment_proof: Option<String>,
    pub created_at: i64,
}

impl OrderDto {
    #[must_use]
    pub fn from_model(order: &Order, money: &CurrencyFormat) -> Self {
        Self {
            id: order.id.get(),
            invoice_number: order.invoice_number.as_str().to_string(),
            payment_method: order.payment_method.as_str().to_string(),
            status: order.status.as_str().to_string(),
            status_code: order.status.code(),
            courier: order.courier.clone(),
            shipping_service: order.shipping_service.clone(),
            address: AddressDto::from_model(&order.address),
            sub_total: order.sub_total,
            sub_total_display: money.format(order.sub_total),
            total_shipping: order.total_shipping,
            total_shipping_display: money.format(order.total_shipping),
            total: order.total,
            total_display: money.format(order.total),
            payment_token: order.payment_token.clone(),
            tracking_number: order.tracking_number.clone(),
            payment_proof: order.payment_proof.clone(),
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderDetailDto {
    pub order: OrderDto,
    pub lines: Vec<OrderLineDto>,
}

impl OrderDetailDto {
    #[must_use]
    pub fn from_parts(order: OrderDto, lines: Vec<OrderLineDto>) -> Self {
        Self { order, lines }
    }
}
