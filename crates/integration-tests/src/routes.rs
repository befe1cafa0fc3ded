//! Route handlers of the mock remote API.
//!
//! Response bodies follow the real service's envelopes: `{ data }` for
//! records, `{ metadata, data }` for listings, `{ message }` or
//! `{ errors: { msg } }` for failures.

use std::collections::HashMap;

use axum::extract::{MatchedPath, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::{Account, Cart, RESET_CODE, Shop, ShopState, StoredOrder};

const NOT_LOGGED_IN: &str = "You are not logged in. Please login to get access";

pub fn router(shop: Shop) -> Router {
    let api = Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/forgotPasswords", post(forgot_password))
        .route("/auth/verifyResetCode", post(verify_reset_code))
        .route("/auth/resetPassword", put(reset_password))
        .route("/users/changeMyPassword", put(change_password))
        .route("/products", get(products))
        .route("/products/{id}", get(product))
        .route("/categories", get(categories))
        .route("/categories/{id}", get(category))
        .route("/brands", get(brands))
        .route("/brands/{id}", get(brand))
        .route("/cart", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route(
            "/cart/{product_id}",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/wishlist", get(get_wishlist).post(add_to_wishlist))
        .route("/wishlist/{product_id}", delete(remove_from_wishlist))
        .route("/orders/user/{user_id}", get(user_orders))
        .route("/orders/checkout-session/{cart_id}", post(checkout_session))
        .route("/orders/{cart_id}", post(cash_order))
        .route_layer(middleware::from_fn_with_state(shop.clone(), record_and_inject))
        .with_state(shop);

    Router::new().nest("/api/v1", api)
}

/// Count every hit per route and answer with an injected failure if one is
/// queued for it.
async fn record_and_inject(
    State(shop): State<Shop>,
    path: MatchedPath,
    request: Request,
    next: Next,
) -> Response {
    let route = format!(
        "{} {}",
        request.method(),
        path.as_str().trim_start_matches("/api/v1")
    );
    {
        let mut state = shop.lock().await;
        *state.hits.entry(route.clone()).or_default() += 1;
        if let Some(status) = state
            .failures
            .get_mut(&route)
            .and_then(std::collections::VecDeque::pop_front)
        {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return fail(status, "Injected failure");
        }
    }
    next.run(request).await
}

// =============================================================================
// Helpers
// =============================================================================

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "statusMsg": "fail", "message": message }))).into_response()
}

fn field_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "message": "fail",
            "errors": { "msg": message, "param": "body", "location": "body" }
        })),
    )
        .into_response()
}

fn text<'a>(body: &'a Value, field: &str) -> &'a str {
    body.get(field).and_then(Value::as_str).unwrap_or_default()
}

fn user_json(account: &Account) -> Value {
    json!({ "name": account.name, "email": account.email, "role": "user" })
}

fn signed_in(state: &ShopState, headers: &HeaderMap) -> Result<Account, Response> {
    headers
        .get("token")
        .and_then(|value| value.to_str().ok())
        .and_then(|token| state.tokens.get(token))
        .and_then(|email| state.accounts.get(email))
        .cloned()
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, NOT_LOGGED_IN))
}

fn cart_body(state: &ShopState, owner: &str, cart: &Cart, populate: bool) -> Value {
    let products: Vec<Value> = cart
        .lines
        .iter()
        .map(|(product_id, count)| {
            let product = if populate {
                state.product(product_id).cloned().unwrap_or(Value::Null)
            } else {
                json!(product_id)
            };
            json!({
                "_id": format!("{}-{product_id}", cart.id),
                "count": count,
                "price": state.price_of(product_id),
                "product": product,
            })
        })
        .collect();
    json!({
        "status": "success",
        "numOfCartItems": cart.lines.len(),
        "cartId": cart.id,
        "data": {
            "_id": cart.id,
            "cartOwner": owner,
            "products": products,
            "totalCartPrice": state.cart_total(cart),
        }
    })
}

// =============================================================================
// Auth
// =============================================================================

async fn sign_up(State(shop): State<Shop>, Json(body): Json<Value>) -> Response {
    let mut state = shop.lock().await;
    let email = text(&body, "email").to_string();
    if state.accounts.contains_key(&email) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "statusMsg": "fail", "message": "Account Already Exists" })),
        )
            .into_response();
    }
    if text(&body, "password") != text(&body, "rePassword") {
        return field_error("Password confirmation is incorrect");
    }

    let account = state.create_account(text(&body, "name"), &email, text(&body, "password"));
    let token = state.issue_token(&account);
    (
        StatusCode::CREATED,
        Json(json!({ "message": "success", "user": user_json(&account), "token": token })),
    )
        .into_response()
}

async fn sign_in(State(shop): State<Shop>, Json(body): Json<Value>) -> Response {
    let mut state = shop.lock().await;
    let account = state
        .accounts
        .get(text(&body, "email"))
        .filter(|account| account.password == text(&body, "password"))
        .cloned();
    let Some(account) = account else {
        return fail(StatusCode::UNAUTHORIZED, "Incorrect email or password");
    };
    let token = state.issue_token(&account);
    Json(json!({ "message": "success", "user": user_json(&account), "token": token }))
        .into_response()
}

async fn forgot_password(State(shop): State<Shop>, Json(body): Json<Value>) -> Response {
    let mut state = shop.lock().await;
    let email = text(&body, "email").to_string();
    if !state.accounts.contains_key(&email) {
        return fail(
            StatusCode::NOT_FOUND,
            &format!("There is no user registered with this email address {email}"),
        );
    }
    state.resets.insert(email, false);
    Json(json!({ "statusMsg": "success", "message": "Reset code sent to your email" }))
        .into_response()
}

async fn verify_reset_code(State(shop): State<Shop>, Json(body): Json<Value>) -> Response {
    let mut state = shop.lock().await;
    if text(&body, "resetCode") != RESET_CODE || state.resets.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Reset code is invalid or has expired");
    }
    for verified in state.resets.values_mut() {
        *verified = true;
    }
    Json(json!({ "status": "Success" })).into_response()
}

async fn reset_password(State(shop): State<Shop>, Json(body): Json<Value>) -> Response {
    let mut state = shop.lock().await;
    let email = text(&body, "email").to_string();
    if state.resets.get(&email) != Some(&true) {
        return fail(StatusCode::BAD_REQUEST, "reset code not verified");
    }
    state.resets.remove(&email);
    let Some(account) = state.accounts.get_mut(&email) else {
        return fail(StatusCode::NOT_FOUND, "There is no user with this email address");
    };
    account.password = text(&body, "newPassword").to_string();
    let account = account.clone();
    let token = state.issue_token(&account);
    Json(json!({ "token": token })).into_response()
}

async fn change_password(
    State(shop): State<Shop>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = shop.lock().await;
    let account = match signed_in(&state, &headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    if account.password != text(&body, "currentPassword") {
        return field_error("Incorrect current password");
    }
    if text(&body, "password") != text(&body, "rePassword") {
        return field_error("Password confirmation is incorrect");
    }
    let new_password = text(&body, "password").to_string();
    let Some(stored) = state.accounts.get_mut(&account.email) else {
        return fail(StatusCode::UNAUTHORIZED, NOT_LOGGED_IN);
    };
    stored.password = new_password;
    let account = stored.clone();
    let token = state.issue_token(&account);
    Json(json!({ "message": "success", "user": user_json(&account), "token": token }))
        .into_response()
}

// =============================================================================
// Catalog
// =============================================================================

async fn products(
    State(shop): State<Shop>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let state = shop.lock().await;
    let number = |key: &str, default: usize| {
        params
            .get(key)
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(default)
    };
    let page = number("page", 1);
    let limit = number("limit", 40);
    let total = state.products.len();
    let pages = total.div_ceil(limit).max(1);
    let data: Vec<Value> = state
        .products
        .iter()
        .skip((page - 1) * limit)
        .take(limit)
        .cloned()
        .collect();

    let mut metadata = json!({ "currentPage": page, "numberOfPages": pages, "limit": limit });
    if page < pages
        && let Some(fields) = metadata.as_object_mut()
    {
        fields.insert("nextPage".to_string(), json!(page + 1));
    }
    Json(json!({ "results": data.len(), "metadata": metadata, "data": data })).into_response()
}

async fn product(State(shop): State<Shop>, Path(id): Path<String>) -> Response {
    let state = shop.lock().await;
    match state.product(&id) {
        Some(product) => Json(json!({ "data": product })).into_response(),
        None => fail(StatusCode::NOT_FOUND, &format!("No product for this id {id}")),
    }
}

async fn categories(State(shop): State<Shop>) -> Response {
    let state = shop.lock().await;
    Json(json!({ "results": state.categories.len(), "data": state.categories })).into_response()
}

async fn category(State(shop): State<Shop>, Path(id): Path<String>) -> Response {
    let state = shop.lock().await;
    match state.categories.iter().find(|c| c["_id"] == id.as_str()) {
        Some(category) => Json(json!({ "data": category })).into_response(),
        None => fail(StatusCode::NOT_FOUND, &format!("No category for this id {id}")),
    }
}

async fn brands(State(shop): State<Shop>) -> Response {
    let state = shop.lock().await;
    Json(json!({ "results": state.brands.len(), "data": state.brands })).into_response()
}

async fn brand(State(shop): State<Shop>, Path(id): Path<String>) -> Response {
    let state = shop.lock().await;
    match state.brands.iter().find(|b| b["_id"] == id.as_str()) {
        Some(brand) => Json(json!({ "data": brand })).into_response(),
        None => fail(StatusCode::NOT_FOUND, &format!("No brand for this id {id}")),
    }
}

// =============================================================================
// Cart
// =============================================================================

async fn get_cart(State(shop): State<Shop>, headers: HeaderMap) -> Response {
    let state = shop.lock().await;
    let account = match signed_in(&state, &headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    match state.carts.get(&account.id) {
        Some(cart) => Json(cart_body(&state, &account.id, cart, true)).into_response(),
        None => fail(
            StatusCode::NOT_FOUND,
            &format!("No cart exist for this user: {}", account.id),
        ),
    }
}

async fn add_to_cart(
    State(shop): State<Shop>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = shop.lock().await;
    let account = match signed_in(&state, &headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    let product_id = text(&body, "productId").to_string();
    if state.product(&product_id).is_none() {
        return fail(StatusCode::NOT_FOUND, &format!("No product for this id {product_id}"));
    }

    let cart_id = state.next_id("cart");
    let cart = state.carts.entry(account.id.clone()).or_insert_with(|| Cart {
        id: cart_id,
        lines: Vec::new(),
    });
    match cart.lines.iter_mut().find(|(id, _)| *id == product_id) {
        Some((_, count)) => *count += 1,
        None => cart.lines.push((product_id, 1)),
    }

    let cart = cart.clone();
    let mut body = cart_body(&state, &account.id, &cart, false);
    if let Some(fields) = body.as_object_mut() {
        fields.insert(
            "message".to_string(),
            json!("Product added successfully to your cart"),
        );
    }
    Json(body).into_response()
}

async fn update_cart_item(
    State(shop): State<Shop>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = shop.lock().await;
    let account = match signed_in(&state, &headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    let Some(count) = body
        .get("count")
        .and_then(Value::as_u64)
        .and_then(|c| u32::try_from(c).ok())
        .filter(|c| *c > 0)
    else {
        return field_error("count must be a positive number");
    };
    let Some(cart) = state.carts.get_mut(&account.id) else {
        return fail(
            StatusCode::NOT_FOUND,
            &format!("No cart exist for this user: {}", account.id),
        );
    };
    let Some(line) = cart.lines.iter_mut().find(|(id, _)| *id == product_id) else {
        return fail(
            StatusCode::NOT_FOUND,
            &format!("there is no item for this id: {product_id}"),
        );
    };
    line.1 = count;

    let cart = cart.clone();
    Json(cart_body(&state, &account.id, &cart, true)).into_response()
}

async fn remove_cart_item(
    State(shop): State<Shop>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Response {
    let mut state = shop.lock().await;
    let account = match signed_in(&state, &headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    let Some(cart) = state.carts.get_mut(&account.id) else {
        return fail(
            StatusCode::NOT_FOUND,
            &format!("No cart exist for this user: {}", account.id),
        );
    };
    cart.lines.retain(|(id, _)| *id != product_id);

    let cart = cart.clone();
    Json(cart_body(&state, &account.id, &cart, true)).into_response()
}

async fn clear_cart(State(shop): State<Shop>, headers: HeaderMap) -> Response {
    let mut state = shop.lock().await;
    let account = match signed_in(&state, &headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    state.carts.remove(&account.id);
    Json(json!({ "message": "success" })).into_response()
}

// =============================================================================
// Wishlist
// =============================================================================

async fn get_wishlist(State(shop): State<Shop>, headers: HeaderMap) -> Response {
    let state = shop.lock().await;
    let account = match signed_in(&state, &headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    let data: Vec<Value> = state
        .wishlists
        .get(&account.id)
        .into_iter()
        .flatten()
        .filter_map(|id| state.product(id).cloned())
        .collect();
    Json(json!({ "status": "success", "count": data.len(), "data": data })).into_response()
}

async fn add_to_wishlist(
    State(shop): State<Shop>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = shop.lock().await;
    let account = match signed_in(&state, &headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    let product_id = text(&body, "productId").to_string();
    if state.product(&product_id).is_none() {
        return fail(StatusCode::NOT_FOUND, &format!("No product for this id {product_id}"));
    }
    let ids = state.wishlists.entry(account.id).or_default();
    if !ids.contains(&product_id) {
        ids.push(product_id);
    }
    Json(json!({
        "status": "success",
        "message": "Product added successfully to your wishlist",
        "data": ids,
    }))
    .into_response()
}

async fn remove_from_wishlist(
    State(shop): State<Shop>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Response {
    let mut state = shop.lock().await;
    let account = match signed_in(&state, &headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    let ids = state.wishlists.entry(account.id).or_default();
    ids.retain(|id| *id != product_id);
    Json(json!({
        "status": "success",
        "message": "Product removed successfully to your wishlist",
        "data": ids,
    }))
    .into_response()
}

// =============================================================================
// Orders
// =============================================================================

async fn user_orders(State(shop): State<Shop>, Path(user_id): Path<String>) -> Response {
    let state = shop.lock().await;
    let orders: Vec<&Value> = state
        .orders
        .iter()
        .filter(|order| order.user_id == user_id)
        .map(|order| &order.body)
        .collect();
    Json(json!(orders)).into_response()
}

fn owned_cart(state: &ShopState, account: &Account, cart_id: &str) -> Result<Cart, Response> {
    state
        .carts
        .get(&account.id)
        .filter(|cart| cart.id == cart_id && !cart.lines.is_empty())
        .cloned()
        .ok_or_else(|| {
            fail(
                StatusCode::NOT_FOUND,
                &format!("There is no such cart with id {cart_id}"),
            )
        })
}

async fn cash_order(
    State(shop): State<Shop>,
    headers: HeaderMap,
    Path(cart_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = shop.lock().await;
    let account = match signed_in(&state, &headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    let cart = match owned_cart(&state, &account, &cart_id) {
        Ok(cart) => cart,
        Err(response) => return response,
    };

    let order = state.place_order(&account, &cart, &body["shippingAddress"]);
    state.carts.remove(&account.id);
    (
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": order })),
    )
        .into_response()
}

async fn checkout_session(
    State(shop): State<Shop>,
    headers: HeaderMap,
    Path(cart_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let state = shop.lock().await;
    let account = match signed_in(&state, &headers) {
        Ok(account) => account,
        Err(response) => return response,
    };
    if let Err(response) = owned_cart(&state, &account, &cart_id) {
        return response;
    }
    let Some(origin) = params.get("url") else {
        return field_error("url query parameter is required");
    };
    let url = format!(
        "https://checkout.stripe.test/c/pay/cs_test_{cart_id}?success_url={origin}/allorders"
    );
    Json(json!({ "status": "success", "session": { "url": url, "mode": "payment" } }))
        .into_response()
}

impl ShopState {
    fn place_order(&mut self, account: &Account, cart: &Cart, address: &Value) -> Value {
        let id = self.next_id("order");
        let created_at = self.clock();
        let items: Vec<Value> = cart
            .lines
            .iter()
            .map(|(product_id, count)| {
                json!({
                    "_id": format!("{id}-{product_id}"),
                    "count": count,
                    "price": self.price_of(product_id),
                    "product": self.product(product_id).cloned().unwrap_or(Value::Null),
                })
            })
            .collect();
        let body = json!({
            "_id": id,
            "user": account.id,
            "shippingAddress": address,
            "cartItems": items,
            "totalOrderPrice": self.cart_total(cart),
            "paymentMethodType": "cash",
            "isPaid": false,
            "isDelivered": false,
            "createdAt": created_at,
            "updatedAt": created_at,
        });
        self.orders.push(StoredOrder {
            user_id: account.id.clone(),
            body: body.clone(),
        });
        body
    }
}
