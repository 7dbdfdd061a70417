use serde_json::json;
use toko_api::{
    ApiError, ApiErrorCode, ApiResponseEnvelope, CartDto, CartLineDto, OrderDetailDto, OrderDto,
    OrderLineDto, ProductCardDto, ProductDto,
};
use toko_model::{
    CartLine, CartLineId, CartTotals, CurrencyFormat, InvoiceNumber, Order, OrderId, OrderLine,
    OrderStatus, PaymentMethod, Product, ProductId, ShippingAddress, Slug, StateId, UserId,
};
use toko_model::{CityId, Category, CategoryId};

fn money() -> CurrencyFormat {
    CurrencyFormat::default()
}

fn sample_product() -> Product {
    Product::new(
        ProductId::new(7).expect("product id"),
        "Kaos Polos Premium".to_string(),
        Slug::parse("kaos-polos-premium").expect("slug"),
        "Katun combed 30s.".to_string(),
        Some("kaos.jpg".to_string()),
        200_000.0,
        0.5,
        12,
        vec![CategoryId::new(1).expect("category id")],
        1_700_000_000,
    )
}

fn sample_address() -> ShippingAddress {
    ShippingAddress::new(
        "Rina Wati".to_string(),
        "+62 812-3456-7890".to_string(),
        StateId::new(1).expect("state id"),
        CityId::new(2).expect("city id"),
        "Jl. Braga No. 10".to_string(),
        "40111".to_string(),
    )
}

fn sample_order() -> Order {
    let id = OrderId::new(42).expect("order id");
    Order::new(
        id,
        UserId::new(9).expect("user id"),
        InvoiceNumber::from_order_id(id),
        PaymentMethod::ManualTransfer,
        OrderStatus::Pending,
        "jne".to_string(),
        "REG".to_string(),
        sample_address(),
        400_000.0,
        15_000.0,
        415_000.0,
        None,
        None,
        None,
        1_700_000_100,
    )
}

#[test]
fn product_dtos_render_rupiah_displays() {
    let product = sample_product();
    let detail = ProductDto::from_model(&product, &money());
    assert_eq!(detail.price_display, "Rp. 200.000");
    assert_eq!(detail.slug, "kaos-polos-premium");
    assert!(detail.in_stock);
    assert_eq!(detail.category_ids, vec![1]);

    let card = ProductCardDto::from_model(&product, &money());
    assert_eq!(card.price_display, "Rp. 200.000");
    let value = serde_json::to_value(&card).expect("card json");
    assert!(
        value.get("description").is_none(),
        "list cards do not carry descriptions"
    );
}

#[test]
fn cart_dto_totals_and_line_totals_agree() {
    let product = sample_product();
    let line = CartLine::new(
        CartLineId::new(3).expect("line id"),
        UserId::new(9).expect("user id"),
        product.id,
        2,
    );
    let mut totals = CartTotals::default();
    totals.add_line(line.quantity, product.price);

    let dto = CartDto::from_parts(
        vec![CartLineDto::from_model(&line, &product, &money())],
        &totals,
        &money(),
    );
    assert_eq!(dto.lines[0].line_total, 400_000.0);
    assert_eq!(dto.lines[0].line_total_display, "Rp. 400.000");
    assert_eq!(dto.meta.total_amount, 400_000.0);
    assert_eq!(dto.meta.total_display, "Rp. 400.000");
    assert_eq!(dto.meta.item_count, 1);
}

#[test]
fn order_dto_carries_both_status_renditions() {
    let dto = OrderDto::from_model(&sample_order(), &money());
    assert_eq!(dto.invoice_number, "INV00042");
    assert_eq!(dto.status, "pending");
    assert_eq!(dto.status_code, 0);
    assert_eq!(dto.payment_method, "manual_transfer");
    assert_eq!(dto.sub_total_display, "Rp. 400.000");
    assert_eq!(dto.total_display, "Rp. 415.000");
    assert_eq!(dto.address.city_id, 2);
}

#[test]
fn order_detail_dto_nests_its_lines() {
    let order = sample_order();
    let line = OrderLine::new(
        1,
        order.id,
        ProductId::new(7).expect("product id"),
        "Kaos Polos Premium".to_string(),
        2,
        200_000.0,
        0.5,
        400_000.0,
    );
    let detail = OrderDetailDto::from_parts(
        OrderDto::from_model(&order, &money()),
        vec![OrderLineDto::from_model(&line, &money())],
    );
    assert_eq!(detail.lines.len(), 1);
    assert_eq!(detail.lines[0].unit_price_display, "Rp. 200.000");
    assert_eq!(detail.order.id, 42);
}

#[test]
fn category_dto_is_flat() {
    let dto = toko_api::CategoryDto::from_model(&Category::new(
        CategoryId::new(5).expect("category id"),
        "Sportswear".to_string(),
    ));
    assert_eq!(
        serde_json::to_value(&dto).expect("json"),
        json!({"id": 5, "name": "Sportswear"})
    );
}

#[test]
fn success_envelope_wraps_data() {
    let envelope = ApiResponseEnvelope::new(vec![1, 2, 3]);
    assert_eq!(
        serde_json::to_value(&envelope).expect("json"),
        json!({"data": [1, 2, 3]})
    );
}

#[test]
fn error_envelope_wraps_error() {
    let err = ApiError::not_found("product");
    let value = err.envelope();
    assert_eq!(value["error"]["code"], json!("not_found"));
    assert_eq!(value["error"]["message"], json!("product not found"));
}

#[test]
fn error_schema_rejects_unknown_fields() {
    let raw = r#"{"code":"not_found","message":"x","details":{},"extra":1}"#;
    let err = serde_json::from_str::<ApiError>(raw).expect_err("deny unknown fields");
    assert!(err.to_string().contains("unknown field"));
}

#[test]
fn error_codes_map_to_stable_statuses_and_strings() {
    let table = [
        (ApiErrorCode::ValidationFailed, 422, "validation_failed"),
        (ApiErrorCode::EmptyCart, 422, "empty_cart"),
        (ApiErrorCode::InsufficientStock, 409, "insufficient_stock"),
        (ApiErrorCode::Conflict, 409, "conflict"),
        (ApiErrorCode::PaymentGatewayFailed, 502, "payment_gateway_failed"),
        (ApiErrorCode::NotFound, 404, "not_found"),
        (ApiErrorCode::Unauthorized, 401, "unauthorized"),
        (ApiErrorCode::Internal, 500, "internal"),
    ];
    for (code, status, name) in table {
        assert_eq!(code.http_status(), status, "{name}");
        assert_eq!(code.as_str(), name);
    }
}

#[test]
fn empty_cart_error_keeps_the_storefront_wording() {
    let err = ApiError::empty_cart();
    assert_eq!(err.message, "Your cart is empty.");
    assert_eq!(err.code.http_status(), 422);
}
