// SPDX-License-Identifier: Apache-2.0

use super::*;

fn api_error_response(err: ApiError) -> Response {
    let status = StatusCode::from_u16(err.code.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"error": err}))).into_response()
}

fn envelope_response<T: serde::Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(ApiResponseEnvelope::new(data))).into_response()
}

fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    if let Some(raw) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    if let Some(raw) = headers.get("traceparent").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return format!("trace-{trimmed}");
        }
    }
    make_request_id(state)
}

fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

/// The frontend proxy authenticates the session and forwards the numeric
/// user id in `x-user-id`. Anything missing or non-positive is a 401.
fn authed_user(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let raw = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();
    if raw.is_empty() {
        return Err(ApiError::unauthorized());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|v| UserId::new(v).ok())
        .ok_or_else(ApiError::unauthorized)
}

fn store_error_to_api(route: &'static str, err: &StoreError) -> ApiError {
    match err.code {
        StoreErrorCode::Io | StoreErrorCode::Internal => error!(route, "store failure: {err}"),
        StoreErrorCode::PaymentGateway => warn!(route, "payment gateway failure: {err}"),
        _ => {}
    }
    api_error_for_store(err)
}

/// The store is synchronous SQLite, so every call moves to a blocking
/// worker rather than stalling the request executor.
async fn run_store<T, F>(state: &AppState, route: &'static str, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || op(&store)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(store_error_to_api(route, &err)),
        Err(e) => {
            error!(route, "store task join failed: {e}");
            Err(ApiError::internal())
        }
    }
}

pub(crate) async fn healthz_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let resp = (StatusCode::OK, "ok").into_response();
    state
        .metrics
        .observe_request("/healthz", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let store_ready = run_store(&state, "/readyz", |store| store.ping()).await.is_ok();
    let resp = if state.ready.load(Ordering::Relaxed) && store_ready {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not-ready").into_response()
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/readyz", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let body = state.metrics.render().await;
    let resp = (StatusCode::OK, body).into_response();
    state
        .metrics
        .observe_request("/metrics", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn version_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let payload = json!({
        "service": {
            "name": CRATE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "api_version": toko_api::API_VERSION,
        },
        "schema": {
            "config": CONFIG_SCHEMA_VERSION,
            "store": toko_store::SCHEMA_VERSION,
        }
    });
    let mut response = Json(payload).into_response();
    if let Ok(value) = HeaderValue::from_str("public, max-age=30") {
        response.headers_mut().insert("cache-control", value);
    }
    state
        .metrics
        .observe_request("/v1/version", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(response, &request_id)
}

async fn categories_response(
    state: &AppState,
    query: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let search = parse_name_search(query)?;
    let categories = run_store(state, "/v1/categories", move |store| {
        store.list_categories(search.as_deref())
    })
    .await?;
    let items: Vec<CategoryDto> = categories.iter().map(CategoryDto::from_model).collect();
    Ok(envelope_response(StatusCode::OK, items))
}

pub(crate) async fn categories_handler(
    State(state): State<AppState>,
    Query(query): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let resp = categories_response(&state, &query)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/categories", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

async fn states_response(
    state: &AppState,
    query: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let search = parse_name_search(query)?;
    let states = run_store(state, "/v1/states", move |store| {
        store.list_states(search.as_deref())
    })
    .await?;
    let items: Vec<StateDto> = states.iter().map(StateDto::from_model).collect();
    Ok(envelope_response(StatusCode::OK, items))
}

pub(crate) async fn states_handler(
    State(state): State<AppState>,
    Query(query): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let resp = states_response(&state, &query)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/states", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

async fn cities_response(
    state: &AppState,
    query: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let state_filter = parse_city_list_params(query)?;
    let cities = run_store(state, "/v1/cities", move |store| {
        store.list_cities(state_filter)
    })
    .await?;
    let items: Vec<CityDto> = cities.iter().map(CityDto::from_model).collect();
    Ok(envelope_response(StatusCode::OK, items))
}

pub(crate) async fn cities_handler(
    State(state): State<AppState>,
    Query(query): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let resp = cities_response(&state, &query)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/cities", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

async fn products_response(
    state: &AppState,
    query: &BTreeMap<String, String>,
) -> Result<Response, ApiError> {
    let params =
        parse_product_list_params_with_limit(query, DEFAULT_PAGE_LIMIT, state.config.max_page_limit)?;
    let order = match params.sort {
        ProductSort::Newest => ProductOrder::Newest,
        ProductSort::PriceAsc => ProductOrder::PriceAsc,
        ProductSort::PriceDesc => ProductOrder::PriceDesc,
    };
    let filter = ProductFilter {
        category_id: params.category,
        min_price: params.min_price,
        max_price: params.max_price,
        search: params.search,
        in_stock_only: params.in_stock_only,
        order,
        limit: Some(params.limit),
        offset: Some(params.offset),
    };
    let products = run_store(state, "/v1/products", move |store| {
        store.list_products(&filter)
    })
    .await?;
    let items: Vec<ProductCardDto> = products
        .iter()
        .map(|product| ProductCardDto::from_model(product, &state.money))
        .collect();
    Ok(envelope_response(StatusCode::OK, items))
}

pub(crate) async fn products_handler(
    State(state): State<AppState>,
    Query(query): Query<BTreeMap<String, String>>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let resp = products_response(&state, &query)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/products", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

async fn product_detail_response(state: &AppState, raw_id: i64) -> Result<Response, ApiError> {
    let product_id = ProductId::new(raw_id).map_err(|_| ApiError::not_found("product"))?;
    let product = run_store(state, "/v1/products/:id", move |store| {
        store.get_product(product_id)
    })
    .await?;
    Ok(envelope_response(
        StatusCode::OK,
        ProductDto::from_model(&product, &state.money),
    ))
}

pub(crate) async fn product_detail_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<i64>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = make_request_id(&state);
    let resp = product_detail_response(&state, raw_id)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/products/:id", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

async fn cart_list_response(state: &AppState, headers: &HeaderMap) -> Result<Response, ApiError> {
    let user = authed_user(headers)?;
    let (entries, totals) = run_store(state, "/v1/cart", move |store| store.list_cart(user)).await?;
    let lines: Vec<CartLineDto> = entries
        .iter()
        .map(|entry| CartLineDto::from_model(&entry.line, &entry.product, &state.money))
        .collect();
    Ok(envelope_response(
        StatusCode::OK,
        CartDto::from_parts(lines, &totals, &state.money),
    ))
}

pub(crate) async fn cart_list_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = cart_list_response(&state, &headers)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/cart", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

async fn cart_upsert_response(
    state: &AppState,
    headers: &HeaderMap,
    body: &Value,
) -> Result<Response, ApiError> {
    let user = authed_user(headers)?;
    let form = parse_cart_form(body)?;
    let product_id = form.product_id()?;
    let quantity = form.quantity;
    let entry = run_store(state, "/v1/cart", move |store| {
        store.upsert_cart_line(user, product_id, quantity)
    })
    .await?;
    Ok(envelope_response(
        StatusCode::OK,
        CartLineDto::from_model(&entry.line, &entry.product, &state.money),
    ))
}

pub(crate) async fn cart_upsert_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = cart_upsert_response(&state, &headers, &body)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/cart", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

async fn cart_update_response(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: i64,
    body: &Value,
) -> Result<Response, ApiError> {
    let user = authed_user(headers)?;
    let line_id = CartLineId::new(raw_id).map_err(|_| ApiError::not_found("cart line"))?;
    let quantity = parse_cart_quantity_form(body)?.quantity;
    let entry = run_store(state, "/v1/cart/:id", move |store| {
        let (entries, _) = store.list_cart(user)?;
        let entry = entries
            .into_iter()
            .find(|entry| entry.line.id == line_id)
            .ok_or_else(|| {
                StoreError::new(
                    StoreErrorCode::NotFound,
                    format!("cart line {} not found", line_id.get()),
                )
            })?;
        store.upsert_cart_line(user, entry.product.id, quantity)
    })
    .await?;
    Ok(envelope_response(
        StatusCode::OK,
        CartLineDto::from_model(&entry.line, &entry.product, &state.money),
    ))
}

pub(crate) async fn cart_update_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = cart_update_response(&state, &headers, raw_id, &body)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/cart/:id", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

async fn cart_delete_response(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: i64,
) -> Result<Response, ApiError> {
    let user = authed_user(headers)?;
    let line_id = CartLineId::new(raw_id).map_err(|_| ApiError::not_found("cart line"))?;
    run_store(state, "/v1/cart/:id", move |store| {
        store.delete_cart_line(user, line_id)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn cart_delete_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<i64>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = cart_delete_response(&state, &headers, raw_id)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/cart/:id", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

/// Quoting degrades instead of failing: a missing shop profile or an
/// unreachable rate provider both come back as an empty option list. An
/// empty cart is the one client error, since there is nothing to weigh.
async fn shipping_cost_response(
    state: &AppState,
    headers: &HeaderMap,
    body: &Value,
) -> Result<Response, ApiError> {
    let user = authed_user(headers)?;
    let form = parse_shipping_cost_form(body)?;
    let destination = form.destination()?;
    let courier = form.courier()?.to_string();
    let weight = run_store(state, "/v1/shipping/cost", move |store| {
        store.cart_weight_kg(user)
    })
    .await?
    .ok_or_else(ApiError::empty_cart)?;
    let options = match run_store(state, "/v1/shipping/cost", |store| store.shop_profile()).await {
        Ok(shop) => {
            let query = RateQuery::new(
                courier,
                shop.city_id,
                destination,
                chargeable_weight_kg(weight),
            );
            match state.shipping.rates(&query).await {
                Ok(options) => options,
                Err(err) => {
                    warn!("shipping rates degraded to none: {err}");
                    Vec::new()
                }
            }
        }
        Err(err) if err.code == ApiErrorCode::NotFound => {
            warn!("shop profile not configured; no shipping options");
            Vec::new()
        }
        Err(err) => return Err(err),
    };
    let items: Vec<RateOptionDto> = options
        .iter()
        .map(|option| RateOptionDto::from_model(option, &state.money))
        .collect();
    Ok(envelope_response(StatusCode::OK, items))
}

pub(crate) async fn shipping_cost_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = shipping_cost_response(&state, &headers, &body)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/shipping/cost", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

async fn orders_list_response(state: &AppState, headers: &HeaderMap) -> Result<Response, ApiError> {
    let user = authed_user(headers)?;
    let orders = run_store(state, "/v1/orders", move |store| store.list_orders(user)).await?;
    let items: Vec<OrderDto> = orders
        .iter()
        .map(|order| OrderDto::from_model(order, &state.money))
        .collect();
    Ok(envelope_response(StatusCode::OK, items))
}

pub(crate) async fn orders_list_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = orders_list_response(&state, &headers)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/orders", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

async fn order_create_response(
    state: &AppState,
    headers: &HeaderMap,
    body: &Value,
    request_id: &str,
) -> Result<Response, ApiError> {
    let user = authed_user(headers)?;
    let draft = parse_order_form(body)?.into_draft()?;
    let store = Arc::clone(&state.store);
    let payment = Arc::clone(&state.payment);
    let detail = match tokio::task::spawn_blocking(move || {
        store.place_order(user, &draft, payment.as_ref())
    })
    .await
    {
        Ok(Ok(detail)) => detail,
        Ok(Err(err)) => return Err(store_error_to_api("/v1/orders", &err)),
        Err(e) => {
            error!("order placement task failed: {e}");
            return Err(ApiError::internal());
        }
    };
    info!(
        request_id = %request_id,
        invoice = %detail.order.invoice_number,
        total = detail.order.total,
        "order placed"
    );
    let order = OrderDto::from_model(&detail.order, &state.money);
    let lines = detail
        .lines
        .iter()
        .map(|line| OrderLineDto::from_model(line, &state.money))
        .collect();
    Ok(envelope_response(
        StatusCode::CREATED,
        OrderDetailDto::from_parts(order, lines),
    ))
}

pub(crate) async fn order_create_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = order_create_response(&state, &headers, &body, &request_id)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/orders", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

async fn order_detail_response(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: i64,
) -> Result<Response, ApiError> {
    let user = authed_user(headers)?;
    let order_id = OrderId::new(raw_id).map_err(|_| ApiError::not_found("order"))?;
    let detail = run_store(state, "/v1/orders/:id", move |store| {
        store.get_order(user, order_id)
    })
    .await?;
    let order = OrderDto::from_model(&detail.order, &state.money);
    let lines = detail
        .lines
        .iter()
        .map(|line| OrderLineDto::from_model(line, &state.money))
        .collect();
    Ok(envelope_response(
        StatusCode::OK,
        OrderDetailDto::from_parts(order, lines),
    ))
}

pub(crate) async fn order_detail_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<i64>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = order_detail_response(&state, &headers, raw_id)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/orders/:id", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

async fn payment_proof_response(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: i64,
    body: &Value,
) -> Result<Response, ApiError> {
    let user = authed_user(headers)?;
    let order_id = OrderId::new(raw_id).map_err(|_| ApiError::not_found("order"))?;
    let proof = parse_payment_proof_form(body)?.proof()?.to_string();
    let order = run_store(state, "/v1/orders/:id/payment-proof", move |store| {
        store.attach_payment_proof(user, order_id, &proof)
    })
    .await?;
    Ok(envelope_response(
        StatusCode::OK,
        OrderDto::from_model(&order, &state.money),
    ))
}

pub(crate) async fn payment_proof_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let resp = payment_proof_response(&state, &headers, raw_id, &body)
        .await
        .unwrap_or_else(api_error_response);
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/orders/:id/payment-proof", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}
