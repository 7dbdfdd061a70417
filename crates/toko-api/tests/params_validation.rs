use serde_json::json;
use std::collections::BTreeMap;
use toko_api::{
    parse_cart_form, parse_city_list_params, parse_name_search, parse_order_form,
    parse_payment_proof_form, parse_product_list_params, parse_shipping_cost_form, ApiErrorCode,
    ProductSort, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
use toko_model::PaymentMethod;

fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn order_body() -> serde_json::Value {
    json!({
        "payment_method": "manual_transfer",
        "courier": "jne",
        "shipping_service": "REG",
        "total_shipping": 15000.0,
        "recipient": "Rina Wati",
        "phone": "+62 812-3456-7890",
        "state_id": 1,
        "city_id": 2,
        "street": "Jl. Braga No. 10",
        "postal_code": "40111",
        "email": "rina@example.com"
    })
}

#[test]
fn product_list_defaults_are_open() {
    let params = parse_product_list_params(&query(&[])).expect("empty query");
    assert_eq!(params.limit, DEFAULT_PAGE_LIMIT);
    assert_eq!(params.offset, 0);
    assert_eq!(params.sort, ProductSort::Newest);
    assert!(params.category.is_none());
    assert!(params.search.is_none());
    assert!(!params.in_stock_only);
}

#[test]
fn product_list_limit_bounds_are_enforced() {
    let err = parse_product_list_params(&query(&[("limit", "0")])).expect_err("limit=0");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);

    let over = format!("{}", MAX_PAGE_LIMIT + 1);
    let err =
        parse_product_list_params(&query(&[("limit", over.as_str())])).expect_err("limit>max");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);

    let max = format!("{MAX_PAGE_LIMIT}");
    let params =
        parse_product_list_params(&query(&[("limit", max.as_str())])).expect("limit=max");
    assert_eq!(params.limit, MAX_PAGE_LIMIT);
}

#[test]
fn product_list_unknown_filter_rejected_with_allowed_list() {
    let err = parse_product_list_params(&query(&[("colour", "red")])).expect_err("unknown filter");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
    assert!(err.message.contains("filter"), "message names the filter");
    assert!(err.details["field_errors"][0]["value"]
        .as_str()
        .unwrap_or("")
        .contains("allowed"));
}

#[test]
fn product_list_sort_contract_is_strict() {
    let asc = parse_product_list_params(&query(&[("sort", "price:asc")])).expect("price:asc");
    assert_eq!(asc.sort, ProductSort::PriceAsc);

    let desc = parse_product_list_params(&query(&[("sort", "price:desc")])).expect("price:desc");
    assert_eq!(desc.sort, ProductSort::PriceDesc);

    let newest =
        parse_product_list_params(&query(&[("sort", "created_at:desc")])).expect("created_at:desc");
    assert_eq!(newest.sort, ProductSort::Newest);

    for raw in ["price", "name:asc", "created_at:asc", "price:desc "] {
        let err = parse_product_list_params(&query(&[("sort", raw)])).expect_err("bad sort");
        assert_eq!(err.code, ApiErrorCode::ValidationFailed, "sort={raw}");
    }
}

#[test]
fn product_list_price_range_is_validated() {
    let params = parse_product_list_params(&query(&[("min_price", "10000"), ("max_price", "50000")]))
        .expect("valid range");
    assert_eq!(params.min_price, Some(10_000.0));
    assert_eq!(params.max_price, Some(50_000.0));

    for bad in [
        query(&[("min_price", "abc")]),
        query(&[("min_price", "-1")]),
        query(&[("max_price", "NaN")]),
        query(&[("min_price", "50000"), ("max_price", "10000")]),
    ] {
        let err = parse_product_list_params(&bad).expect_err("bad price filter");
        assert_eq!(err.code, ApiErrorCode::ValidationFailed);
    }
}

#[test]
fn product_list_category_must_be_a_positive_id() {
    let params = parse_product_list_params(&query(&[("category", "7")])).expect("category=7");
    assert_eq!(params.category.map(|c| c.get()), Some(7));

    for raw in ["0", "-3", "shoes"] {
        let err = parse_product_list_params(&query(&[("category", raw)])).expect_err("bad category");
        assert_eq!(err.code, ApiErrorCode::ValidationFailed, "category={raw}");
    }
}

#[test]
fn product_list_search_is_trimmed_and_blank_means_absent() {
    let params = parse_product_list_params(&query(&[("q", "  kaos  ")])).expect("trimmed q");
    assert_eq!(params.search.as_deref(), Some("kaos"));

    let blank = parse_product_list_params(&query(&[("q", "   ")])).expect("blank q");
    assert!(blank.search.is_none());
}

#[test]
fn product_list_in_stock_flag_contract() {
    for raw in ["1", "true", "TRUE"] {
        let params = parse_product_list_params(&query(&[("in_stock", raw)])).expect("truthy");
        assert!(params.in_stock_only, "in_stock={raw}");
    }
    let params = parse_product_list_params(&query(&[("in_stock", "0")])).expect("falsy");
    assert!(!params.in_stock_only);
}

#[test]
fn name_search_shares_the_strict_key_contract() {
    assert_eq!(
        parse_name_search(&query(&[("q", " ban ")])).expect("q"),
        Some("ban".to_string())
    );
    assert_eq!(parse_name_search(&query(&[])).expect("no q"), None);

    let err = parse_name_search(&query(&[("name", "ban")])).expect_err("wrong key");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
}

#[test]
fn city_list_state_filter_is_strict() {
    let state = parse_city_list_params(&query(&[("state", "4")])).expect("state=4");
    assert_eq!(state.map(|s| s.get()), Some(4));
    assert!(parse_city_list_params(&query(&[])).expect("no state").is_none());

    for raw in ["0", "x"] {
        let err = parse_city_list_params(&query(&[("state", raw)])).expect_err("bad state");
        assert_eq!(err.code, ApiErrorCode::ValidationFailed, "state={raw}");
    }
}

#[test]
fn cart_form_decodes_and_checks_the_product_id() {
    let form = parse_cart_form(&json!({"product_id": 3, "quantity": 2})).expect("cart form");
    assert_eq!(form.quantity, 2);
    assert_eq!(form.product_id().expect("id").get(), 3);

    let zero = parse_cart_form(&json!({"product_id": 0, "quantity": 2})).expect("decodes");
    let err = zero.product_id().expect_err("product_id=0");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);

    let err = parse_cart_form(&json!({"product_id": 3, "quantity": 2, "gift_wrap": true}))
        .expect_err("unknown field");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);

    let err = parse_cart_form(&json!({"product_id": 3, "quantity": -1}))
        .expect_err("negative quantity");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
}

#[test]
fn cart_quantity_form_is_quantity_only() {
    let form =
        toko_api::parse_cart_quantity_form(&json!({"quantity": 4})).expect("quantity form");
    assert_eq!(form.quantity, 4);

    let err = toko_api::parse_cart_quantity_form(&json!({"quantity": 4, "product_id": 1}))
        .expect_err("unknown field");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
}

#[test]
fn shipping_cost_form_requires_a_courier_and_a_real_city() {
    let form = parse_shipping_cost_form(&json!({"city_id": 9, "courier": " jne "}))
        .expect("shipping form");
    assert_eq!(form.destination().expect("city").get(), 9);
    assert_eq!(form.courier().expect("courier"), "jne");

    let blank = parse_shipping_cost_form(&json!({"city_id": 9, "courier": "  "}))
        .expect("decodes");
    assert_eq!(
        blank.courier().expect_err("blank courier").code,
        ApiErrorCode::ValidationFailed
    );

    let zero = parse_shipping_cost_form(&json!({"city_id": 0, "courier": "jne"})).expect("decodes");
    assert_eq!(
        zero.destination().expect_err("city_id=0").code,
        ApiErrorCode::ValidationFailed
    );
}

#[test]
fn order_form_happy_path_builds_a_draft() {
    let draft = parse_order_form(&order_body())
        .expect("order form")
        .into_draft()
        .expect("draft");
    assert_eq!(draft.payment_method, PaymentMethod::ManualTransfer);
    assert_eq!(draft.courier, "jne");
    assert_eq!(draft.total_shipping, 15_000.0);
    assert_eq!(draft.address.recipient, "Rina Wati");
    assert_eq!(draft.email.as_deref(), Some("rina@example.com"));
}

#[test]
fn order_form_rejects_client_supplied_totals() {
    for field in ["total", "sub_total"] {
        let mut body = order_body();
        body[field] = json!(1.0);
        let err = parse_order_form(&body).expect_err("smuggled total");
        assert_eq!(err.code, ApiErrorCode::ValidationFailed, "field={field}");
        assert!(
            err.details["field_errors"][0]["reason"]
                .as_str()
                .unwrap_or("")
                .contains("unknown field"),
            "field={field}"
        );
    }
}

#[test]
fn order_form_rejects_unknown_payment_methods_and_bad_ids() {
    let mut body = order_body();
    body["payment_method"] = json!("cash_on_delivery");
    let err = parse_order_form(&body)
        .expect("decodes")
        .into_draft()
        .expect_err("unknown payment method");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);

    let mut body = order_body();
    body["state_id"] = json!(0);
    let err = parse_order_form(&body)
        .expect("decodes")
        .into_draft()
        .expect_err("state_id=0");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
}

#[test]
fn order_form_email_is_optional_and_blank_collapses_to_none() {
    let mut body = order_body();
    if let Some(map) = body.as_object_mut() {
        map.remove("email");
    }
    let draft = parse_order_form(&body)
        .expect("no email")
        .into_draft()
        .expect("draft");
    assert!(draft.email.is_none());

    let mut body = order_body();
    body["email"] = json!("   ");
    let draft = parse_order_form(&body)
        .expect("blank email")
        .into_draft()
        .expect("draft");
    assert!(draft.email.is_none());

    let mut body = order_body();
    body["email"] = json!("not-an-email");
    let err = parse_order_form(&body)
        .expect("decodes")
        .into_draft()
        .expect_err("email without @");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
}

#[test]
fn order_form_surfaces_draft_validation_failures() {
    let mut body = order_body();
    body["recipient"] = json!("");
    let err = parse_order_form(&body)
        .expect("decodes")
        .into_draft()
        .expect_err("blank recipient");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);

    let mut body = order_body();
    body["total_shipping"] = json!(-500.0);
    let err = parse_order_form(&body)
        .expect("decodes")
        .into_draft()
        .expect_err("negative shipping");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
}

#[test]
fn payment_proof_form_trims_and_rejects_blank() {
    let form = parse_payment_proof_form(&json!({"payment_proof": " transfer-7781.jpg "}))
        .expect("proof form");
    assert_eq!(form.proof().expect("proof"), "transfer-7781.jpg");

    let blank = parse_payment_proof_form(&json!({"payment_proof": "   "})).expect("decodes");
    assert_eq!(
        blank.proof().expect_err("blank proof").code,
        ApiErrorCode::ValidationFailed
    );

    let err = parse_payment_proof_form(&json!({"proof": "x.jpg"})).expect_err("wrong key");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
}
