// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use toko_model::{RateOption, Shop};
use toko_server::{build_router, AppState, ShippingGateway, StaticShippingGateway};
use toko_store::{FakePaymentGateway, NewProduct, PaymentGateway, Store};

struct Seed {
    state_id: i64,
    city_id: i64,
    product_id: i64,
}

fn seeded_store() -> (Arc<Store>, Seed) {
    let store = Store::open_in_memory().expect("open store");
    let seed = seed_catalog(&store);
    (Arc::new(store), seed)
}

fn seed_catalog(store: &Store) -> Seed {
    let state = store.insert_state("Jawa Barat").expect("state");
    let origin = store.insert_city(state.id, "Bandung").expect("origin city");
    let destination = store.insert_city(state.id, "Bekasi").expect("destination city");
    let category = store.insert_category("Pakaian").expect("category");
    let product = store
        .insert_product(&NewProduct {
            name: "Kaos Polos Premium".to_string(),
            slug: None,
            description: "Katun combed 30s".to_string(),
            image: None,
            price: 200_000.0,
            weight_kg: 0.5,
            stock: 10,
            category_ids: vec![category.id],
        })
        .expect("product");
    store
        .set_shop_profile(&Shop::new(
            "Toko Baju".to_string(),
            "Budi".to_string(),
            "toko@example.com".to_string(),
            "+62 22 1234567".to_string(),
            state.id,
            origin.id,
            "Jl. Asia Afrika No. 1".to_string(),
        ))
        .expect("shop profile");
    Seed {
        state_id: state.id.get(),
        city_id: destination.id.get(),
        product_id: product.id.get(),
    }
}

fn canned_rates() -> Arc<dyn ShippingGateway> {
    Arc::new(StaticShippingGateway::with_options(vec![
        RateOption::new("REG".to_string(), "Layanan Reguler".to_string(), 15_000.0),
        RateOption::new("YES".to_string(), "Yakin Esok Sampai".to_string(), 28_000.0),
    ]))
}

async fn spawn_app(state: AppState) -> std::net::SocketAddr {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

async fn send_raw(
    addr: std::net::SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&Value>,
) -> (u16, String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let payload = body.map(Value::to_string).unwrap_or_default();
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (name, value) in headers {
        req.push_str(&format!("{name}: {value}\r\n"));
    }
    if body.is_some() {
        req.push_str("content-type: application/json\r\n");
        req.push_str(&format!("content-length: {}\r\n", payload.len()));
    }
    req.push_str("\r\n");
    req.push_str(&payload);
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, tail) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    (status, head.to_string(), tail.to_string())
}

async fn get(addr: std::net::SocketAddr, path: &str) -> (u16, String, String) {
    send_raw(addr, "GET", path, &[], None).await
}

fn parse_json(body: &str) -> Value {
    serde_json::from_str(body).expect("json body")
}

fn order_body(method: &str, seed: &Seed) -> Value {
    json!({
        "payment_method": method,
        "courier": "jne",
        "shipping_service": "REG",
        "total_shipping": 15_000.0,
        "recipient": "Rina Wati",
        "phone": "+62 812-3456-7890",
        "state_id": seed.state_id,
        "city_id": seed.city_id,
        "street": "Jl. Braga No. 10",
        "postal_code": "40111",
        "email": "rina@example.com"
    })
}

#[tokio::test]
async fn health_version_and_catalog_endpoints_respond() {
    let (store, seed) = seeded_store();
    let payment: Arc<dyn PaymentGateway> = Arc::new(FakePaymentGateway::succeeding("tok-itest"));
    let addr = spawn_app(AppState::new(store, canned_rates(), payment)).await;

    let (status, head, body) = get(addr, "/healthz").await;
    assert_eq!(status, 200);
    assert_eq!(body, "ok");
    assert!(head.to_ascii_lowercase().contains("x-request-id:"));

    let (status, _, body) = get(addr, "/readyz").await;
    assert_eq!(status, 200);
    assert_eq!(body, "ready");

    let (status, _, body) = get(addr, "/v1/version").await;
    assert_eq!(status, 200);
    let version = parse_json(&body);
    assert_eq!(version["service"]["name"], "toko-server");
    assert_eq!(version["service"]["api_version"], "v1");
    assert_eq!(version["schema"]["store"], 1);

    let (status, _, body) = get(addr, "/v1/categories").await;
    assert_eq!(status, 200);
    let categories = parse_json(&body);
    assert_eq!(categories["data"][0]["name"], "Pakaian");

    let (status, _, body) = get(addr, "/v1/products").await;
    assert_eq!(status, 200);
    let products = parse_json(&body);
    assert_eq!(products["data"][0]["name"], "Kaos Polos Premium");
    assert_eq!(products["data"][0]["price_display"], "Rp. 200.000");
    assert!(products["data"][0].get("description").is_none());

    let (status, _, body) = get(addr, &format!("/v1/products/{}", seed.product_id)).await;
    assert_eq!(status, 200);
    let product = parse_json(&body);
    assert_eq!(product["data"]["description"], "Katun combed 30s");
    assert_eq!(product["data"]["stock"], 10);

    let (status, _, body) = get(addr, "/v1/states").await;
    assert_eq!(status, 200);
    assert_eq!(parse_json(&body)["data"][0]["name"], "Jawa Barat");

    let (status, _, body) = get(addr, &format!("/v1/cities?state={}", seed.state_id)).await;
    assert_eq!(status, 200);
    let cities = parse_json(&body);
    assert_eq!(cities["data"].as_array().map(Vec::len), Some(2));

    let (status, _, _) = get(addr, "/v1/products/99999").await;
    assert_eq!(status, 404);

    let (status, _, body) = get(addr, "/metrics").await;
    assert_eq!(status, 200);
    assert!(body.contains("toko_requests_total{route=\"/healthz\",status=\"200\"}"));
}

#[tokio::test]
async fn bad_filters_and_limits_are_rejected() {
    let (store, _) = seeded_store();
    let payment: Arc<dyn PaymentGateway> = Arc::new(FakePaymentGateway::succeeding("tok-itest"));
    let addr = spawn_app(AppState::new(store, canned_rates(), payment)).await;

    let (status, _, body) = get(addr, "/v1/products?flavour=mint").await;
    assert_eq!(status, 422);
    let err = parse_json(&body);
    assert_eq!(err["error"]["code"], "validation_failed");
    assert_eq!(err["error"]["details"]["field_errors"][0]["parameter"], "flavour");

    let (status, _, _) = get(addr, "/v1/products?limit=0").await;
    assert_eq!(status, 422);

    let (status, _, _) = get(addr, "/v1/products?sort=name:asc").await;
    assert_eq!(status, 422);

    let (status, _, _) = get(addr, "/v1/cities?state=abc").await;
    assert_eq!(status, 422);
}

#[tokio::test]
async fn cart_flow_requires_auth_and_upserts_by_product() {
    let (store, seed) = seeded_store();
    let payment: Arc<dyn PaymentGateway> = Arc::new(FakePaymentGateway::succeeding("tok-itest"));
    let addr = spawn_app(AppState::new(store, canned_rates(), payment)).await;
    let user = [("x-user-id", "1")];

    let (status, _, body) = get(addr, "/v1/cart").await;
    assert_eq!(status, 401);
    assert_eq!(parse_json(&body)["error"]["code"], "unauthorized");

    let add = json!({"product_id": seed.product_id, "quantity": 2});
    let (status, _, body) = send_raw(addr, "POST", "/v1/cart", &user, Some(&add)).await;
    assert_eq!(status, 200);
    let line = parse_json(&body);
    assert_eq!(line["data"]["quantity"], 2);
    assert_eq!(line["data"]["line_total_display"], "Rp. 400.000");
    let line_id = line["data"]["id"].as_i64().expect("line id");

    // Same product again replaces the quantity instead of adding a line.
    let replace = json!({"product_id": seed.product_id, "quantity": 5});
    let (status, _, body) = send_raw(addr, "POST", "/v1/cart", &user, Some(&replace)).await;
    assert_eq!(status, 200);
    assert_eq!(parse_json(&body)["data"]["id"].as_i64(), Some(line_id));

    let (status, _, body) = send_raw(addr, "GET", "/v1/cart", &user, None).await;
    assert_eq!(status, 200);
    let cart = parse_json(&body);
    assert_eq!(cart["data"]["lines"].as_array().map(Vec::len), Some(1));
    assert_eq!(cart["data"]["meta"]["item_count"], 1);
    assert_eq!(cart["data"]["meta"]["total_display"], "Rp. 1.000.000");

    let update = json!({"quantity": 3});
    let (status, _, body) = send_raw(
        addr,
        "PUT",
        &format!("/v1/cart/{line_id}"),
        &user,
        Some(&update),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(parse_json(&body)["data"]["quantity"], 3);

    let (status, _, _) = send_raw(
        addr,
        "DELETE",
        &format!("/v1/cart/{line_id}"),
        &user,
        None,
    )
    .await;
    assert_eq!(status, 204);

    let (status, _, body) = send_raw(addr, "GET", "/v1/cart", &user, None).await;
    assert_eq!(status, 200);
    let cart = parse_json(&body);
    assert_eq!(cart["data"]["lines"].as_array().map(Vec::len), Some(0));
    assert_eq!(cart["data"]["meta"]["total_display"], "Rp. 0");

    let (status, _, _) = send_raw(addr, "DELETE", "/v1/cart/424242", &user, None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn shipping_quotes_weigh_the_cart_and_degrade() {
    let (store, seed) = seeded_store();
    let payment: Arc<dyn PaymentGateway> = Arc::new(FakePaymentGateway::succeeding("tok-itest"));
    let addr = spawn_app(AppState::new(Arc::clone(&store), canned_rates(), payment)).await;
    let user = [("x-user-id", "1")];
    let quote = json!({"city_id": seed.city_id, "courier": "jne"});

    let (status, _, body) = send_raw(addr, "POST", "/v1/shipping/cost", &user, Some(&quote)).await;
    assert_eq!(status, 422);
    let err = parse_json(&body);
    assert_eq!(err["error"]["code"], "empty_cart");
    assert_eq!(err["error"]["message"], "Your cart is empty.");

    let add = json!({"product_id": seed.product_id, "quantity": 2});
    let (status, _, _) = send_raw(addr, "POST", "/v1/cart", &user, Some(&add)).await;
    assert_eq!(status, 200);

    let (status, _, body) = send_raw(addr, "POST", "/v1/shipping/cost", &user, Some(&quote)).await;
    assert_eq!(status, 200);
    let options = parse_json(&body);
    assert_eq!(options["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(options["data"][0]["service"], "REG");
    assert_eq!(options["data"][0]["cost_display"], "Rp. 15.000");

    // A downed rate provider degrades to "no options", not an error.
    let payment: Arc<dyn PaymentGateway> = Arc::new(FakePaymentGateway::succeeding("tok-itest"));
    let down = AppState::new(
        store,
        Arc::new(StaticShippingGateway::unavailable()),
        payment,
    );
    let addr = spawn_app(down).await;
    let (status, _, body) = send_raw(addr, "POST", "/v1/shipping/cost", &user, Some(&quote)).await;
    assert_eq!(status, 200);
    assert_eq!(parse_json(&body)["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn order_placement_walks_the_full_checkout() {
    // File-backed store, as deployed, rather than the in-memory shortcut.
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(&dir.path().join("toko.db")).expect("open store");
    let seed = seed_catalog(&store);
    let payment: Arc<dyn PaymentGateway> = Arc::new(FakePaymentGateway::succeeding("tok-itest"));
    let addr = spawn_app(AppState::new(Arc::new(store), canned_rates(), payment)).await;
    let user = [("x-user-id", "1")];

    let (status, _, body) = send_raw(
        addr,
        "POST",
        "/v1/orders",
        &user,
        Some(&order_body("manual_transfer", &seed)),
    )
    .await;
    assert_eq!(status, 422);
    assert_eq!(parse_json(&body)["error"]["code"], "empty_cart");

    let add = json!({"product_id": seed.product_id, "quantity": 2});
    let (status, _, _) = send_raw(addr, "POST", "/v1/cart", &user, Some(&add)).await;
    assert_eq!(status, 200);

    // Client-supplied totals are rejected outright.
    let mut tampered = order_body("manual_transfer", &seed);
    tampered["total"] = json!(1.0);
    let (status, _, body) = send_raw(addr, "POST", "/v1/orders", &user, Some(&tampered)).await;
    assert_eq!(status, 422);
    assert_eq!(parse_json(&body)["error"]["code"], "validation_failed");

    let (status, _, body) = send_raw(
        addr,
        "POST",
        "/v1/orders",
        &user,
        Some(&order_body("manual_transfer", &seed)),
    )
    .await;
    assert_eq!(status, 201);
    let placed = parse_json(&body);
    let order = &placed["data"]["order"];
    assert_eq!(order["invoice_number"], "INV00001");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["status_code"], 0);
    assert_eq!(order["sub_total"], 400_000.0);
    assert_eq!(order["total_shipping"], 15_000.0);
    assert_eq!(order["total"], 415_000.0);
    assert_eq!(order["total_display"], "Rp. 415.000");
    assert_eq!(placed["data"]["lines"].as_array().map(Vec::len), Some(1));
    assert_eq!(placed["data"]["lines"][0]["quantity"], 2);
    let order_id = order["id"].as_i64().expect("order id");

    // Placement consumed the cart and the stock.
    let (_, _, body) = send_raw(addr, "GET", "/v1/cart", &user, None).await;
    assert_eq!(parse_json(&body)["data"]["lines"].as_array().map(Vec::len), Some(0));
    let (_, _, body) = get(addr, &format!("/v1/products/{}", seed.product_id)).await;
    assert_eq!(parse_json(&body)["data"]["stock"], 8);

    let (status, _, body) = send_raw(addr, "GET", "/v1/orders", &user, None).await;
    assert_eq!(status, 200);
    assert_eq!(parse_json(&body)["data"].as_array().map(Vec::len), Some(1));

    let (status, _, body) = send_raw(addr, "GET", &format!("/v1/orders/{order_id}"), &user, None).await;
    assert_eq!(status, 200);
    assert_eq!(
        parse_json(&body)["data"]["order"]["invoice_number"],
        "INV00001"
    );

    let proof = json!({"payment_proof": "transfer-receipt-001.jpg"});
    let (status, _, body) = send_raw(
        addr,
        "PUT",
        &format!("/v1/orders/{order_id}/payment-proof"),
        &user,
        Some(&proof),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        parse_json(&body)["data"]["payment_proof"],
        "transfer-receipt-001.jpg"
    );

    // Another user cannot see this order.
    let other = [("x-user-id", "2")];
    let (status, _, _) = send_raw(addr, "GET", &format!("/v1/orders/{order_id}"), &other, None).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn gateway_failure_rolls_back_online_checkout() {
    let (store, seed) = seeded_store();
    let payment: Arc<dyn PaymentGateway> = Arc::new(FakePaymentGateway::failing());
    let addr = spawn_app(AppState::new(Arc::clone(&store), canned_rates(), payment)).await;
    let user = [("x-user-id", "1")];

    let add = json!({"product_id": seed.product_id, "quantity": 3});
    let (status, _, _) = send_raw(addr, "POST", "/v1/cart", &user, Some(&add)).await;
    assert_eq!(status, 200);

    let (status, _, body) = send_raw(
        addr,
        "POST",
        "/v1/orders",
        &user,
        Some(&order_body("online_gateway", &seed)),
    )
    .await;
    assert_eq!(status, 502);
    assert_eq!(parse_json(&body)["error"]["code"], "payment_gateway_failed");

    // Nothing stuck: stock, cart, and order list are untouched.
    let (_, _, body) = get(addr, &format!("/v1/products/{}", seed.product_id)).await;
    assert_eq!(parse_json(&body)["data"]["stock"], 10);
    let (_, _, body) = send_raw(addr, "GET", "/v1/cart", &user, None).await;
    assert_eq!(parse_json(&body)["data"]["lines"].as_array().map(Vec::len), Some(1));
    let (_, _, body) = send_raw(addr, "GET", "/v1/orders", &user, None).await;
    assert_eq!(parse_json(&body)["data"].as_array().map(Vec::len), Some(0));

    // A working gateway accepts the same checkout and returns the token.
    let ok: Arc<dyn PaymentGateway> = Arc::new(FakePaymentGateway::succeeding("tok-snap-1"));
    let addr = spawn_app(AppState::new(store, canned_rates(), ok)).await;
    let (status, _, body) = send_raw(
        addr,
        "POST",
        "/v1/orders",
        &user,
        Some(&order_body("online_gateway", &seed)),
    )
    .await;
    assert_eq!(status, 201);
    let placed = parse_json(&body);
    assert_eq!(placed["data"]["order"]["payment_token"], "tok-snap-1");
    assert_eq!(placed["data"]["order"]["payment_method"], "online_gateway");
}
