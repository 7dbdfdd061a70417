#![forbid(unsafe_code)]
//! Wire contract for the storefront API: request parsing, response DTOs,
//! and the error envelope. This crate knows nothing about SQLite or HTTP
//! frameworks; it turns raw query maps and JSON bodies into domain inputs
//! and domain outputs into JSON shapes.

mod dto;
mod errors;
mod params;
mod responses;

pub use dto::{
    AddressDto, CartDto, CartLineDto, CartMetaDto, CategoryDto, CityDto, OrderDetailDto, OrderDto,
    OrderLineDto, ProductCardDto, ProductDto, RateOptionDto, StateDto,
};
pub use errors::{ApiError, ApiErrorCode};
pub use params::{
    parse_cart_form, parse_cart_quantity_form, parse_city_list_params, parse_name_search,
    parse_order_form, parse_payment_proof_form, parse_product_list_params,
    parse_product_list_params_with_limit, parse_shipping_cost_form, CartForm, CartQuantityForm,
    OrderForm, PaymentProofForm, ProductListParams, ProductSort, ShippingCostForm,
    ALLOWED_CITY_FILTERS, ALLOWED_NAME_FILTERS, ALLOWED_PRODUCT_FILTERS, DEFAULT_PAGE_LIMIT,
    MAX_PAGE_LIMIT,
};
pub use responses::ApiResponseEnvelope;

pub const CRATE_NAME: &str = "toko-api";
pub const API_VERSION: &str = "v1";
