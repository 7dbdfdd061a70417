#![forbid(unsafe_code)]
//! Storefront model SSOT.
//!
//! ```compile_fail
//! use toko_model::OrderStatus;
//!
//! fn exhaustive_match(s: OrderStatus) -> &'static str {
//!     match s {
//!         OrderStatus::Pending => "p",
//!         OrderStatus::Paid => "pd",
//!         OrderStatus::Shipped => "s",
//!         OrderStatus::Completed => "c",
//!         OrderStatus::Canceled => "x",
//!     }
//! }
//! ```

mod cart;
mod catalog;
mod currency;
mod ids;
mod order;
mod payment;
mod shipping;

pub use cart::{CartLine, CartTotals};
pub use catalog::{
    Category, City, Product, Shop, Slug, State, DESCRIPTION_MAX_LEN, NAME_MAX_LEN, SLUG_MAX_LEN,
};
pub use currency::{CurrencyFormat, CURRENCY_DECIMAL_PLACES_MAX, CURRENCY_PREFIX_MAX_LEN};
pub use ids::{
    CartLineId, CategoryId, CityId, OrderId, ParseError, ProductId, StateId, UserId,
};
pub use order::{
    status_with_tracking, InvoiceNumber, Order, OrderDraft, OrderLine, OrderStatus, PaymentMethod,
    ShippingAddress, COURIER_MAX_LEN, INVOICE_PAD_WIDTH, INVOICE_PREFIX, PHONE_MAX_LEN,
    POSTAL_CODE_MAX_LEN, RECIPIENT_MAX_LEN, SERVICE_MAX_LEN, STREET_MAX_LEN,
};
pub use payment::{PaymentCustomer, PaymentItem, PaymentRequest, SHIPPING_ITEM_ID};
pub use shipping::{chargeable_weight_kg, RateOption, RateQuery, MIN_CHARGEABLE_WEIGHT_KG};

pub const CRATE_NAME: &str = "toko-model";
