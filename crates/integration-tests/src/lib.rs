//! Integration tests for ShopMart.
//!
//! The tests drive the real [`ShopClient`](shopmart_storefront::api::ShopClient),
//! session signal and synchronizers against [`MockShop`], an in-process
//! `axum` imitation of the remote API bound to `127.0.0.1:0`. No network
//! access or external services are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopmart-integration-tests
//! ```
//!
//! # Failure injection
//!
//! Routes are named by method and path pattern relative to `/api/v1`, for
//! example `"POST /cart"` or `"DELETE /wishlist/{product_id}"`.
//! [`MockShop::fail_next`] queues an error status for the next hit of a
//! route and [`MockShop::hits`] counts how often a route was called.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast, watch};

use shopmart_storefront::sync::Notification;
use shopmart_storefront::{Storefront, StorefrontConfig};

mod fixtures;
mod routes;

pub use fixtures::{BRANDS, CATEGORIES};

/// The only reset code the mock accepts.
pub const RESET_CODE: &str = "123456";

/// Return origin configured for every test storefront.
pub const RETURN_URL: &str = "http://localhost:3000";

/// How long helpers wait for a synchronizer to publish.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

type Shop = Arc<Mutex<ShopState>>;

#[derive(Debug, Clone)]
struct Account {
    id: String,
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Clone)]
struct Cart {
    id: String,
    lines: Vec<(String, u32)>,
}

#[derive(Debug)]
struct StoredOrder {
    user_id: String,
    body: Value,
}

#[derive(Debug)]
struct ShopState {
    products: Vec<Value>,
    categories: Vec<Value>,
    brands: Vec<Value>,
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, String>,
    carts: HashMap<String, Cart>,
    wishlists: HashMap<String, Vec<String>>,
    orders: Vec<StoredOrder>,
    resets: HashMap<String, bool>,
    failures: HashMap<String, VecDeque<u16>>,
    hits: HashMap<String, usize>,
    sequence: u64,
    started_at: DateTime<Utc>,
}

impl ShopState {
    fn new() -> Self {
        Self {
            products: fixtures::products(),
            categories: fixtures::categories(),
            brands: fixtures::brands(),
            accounts: HashMap::new(),
            tokens: HashMap::new(),
            carts: HashMap::new(),
            wishlists: HashMap::new(),
            orders: Vec::new(),
            resets: HashMap::new(),
            failures: HashMap::new(),
            hits: HashMap::new(),
            sequence: 0,
            started_at: Utc::now(),
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{prefix}{:020x}", self.sequence)
    }

    /// Strictly increasing timestamps so ordering by time is deterministic.
    fn clock(&mut self) -> String {
        self.sequence += 1;
        let offset = i64::try_from(self.sequence).unwrap_or(i64::MAX);
        (self.started_at + chrono::Duration::seconds(offset)).to_rfc3339()
    }

    fn product(&self, id: &str) -> Option<&Value> {
        self.products.iter().find(|p| p["_id"] == id)
    }

    fn price_of(&self, id: &str) -> i64 {
        self.product(id)
            .and_then(|p| p["price"].as_i64())
            .unwrap_or_default()
    }

    fn cart_total(&self, cart: &Cart) -> i64 {
        cart.lines
            .iter()
            .map(|(id, count)| self.price_of(id) * i64::from(*count))
            .sum()
    }

    fn create_account(&mut self, name: &str, email: &str, password: &str) -> Account {
        let account = Account {
            id: self.next_id("user"),
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.accounts.insert(email.to_string(), account.clone());
        account
    }

    fn issue_token(&mut self, account: &Account) -> String {
        self.sequence += 1;
        let exp = (Utc::now() + chrono::Duration::days(90)).timestamp();
        let token = mint_token(&account.id, &account.name, exp, self.sequence);
        self.tokens.insert(token.clone(), account.email.clone());
        token
    }
}

/// Build a JWT-shaped credential. Only the payload matters to the client.
#[must_use]
pub fn mint_token(user_id: &str, name: &str, exp: i64, nonce: u64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({
        "id": user_id,
        "name": name,
        "role": "user",
        "iat": Utc::now().timestamp(),
        "exp": exp,
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.mock-signature-{nonce}")
}

/// In-process mock of the remote API.
#[derive(Debug, Clone)]
pub struct MockShop {
    url: String,
    shop: Shop,
}

impl MockShop {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let shop: Shop = Arc::new(Mutex::new(ShopState::new()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock listener");
        let addr = listener
            .local_addr()
            .expect("Failed to read mock address");

        let app = routes::router(shop.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                report_stopped(&e);
            }
        });

        Self {
            url: format!("http://{addr}"),
            shop,
        }
    }

    /// Root URL to configure the client with.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Register an account directly. Returns its user ID.
    pub async fn add_account(&self, name: &str, email: &str, password: &str) -> String {
        self.shop
            .lock()
            .await
            .create_account(name, email, password)
            .id
    }

    /// Answer the next hit of `route` with `status`.
    pub async fn fail_next(&self, route: &str, status: u16) {
        self.shop
            .lock()
            .await
            .failures
            .entry(route.to_string())
            .or_default()
            .push_back(status);
    }

    /// Number of requests `route` has served (injected failures included).
    pub async fn hits(&self, route: &str) -> usize {
        self.shop
            .lock()
            .await
            .hits
            .get(route)
            .copied()
            .unwrap_or_default()
    }

    /// Total requests across every route.
    pub async fn total_hits(&self) -> usize {
        self.shop.lock().await.hits.values().sum()
    }

    /// Put `lines` (`(product_id, count)`) in a user's cart. Returns the cart ID.
    pub async fn seed_cart(&self, user_id: &str, lines: &[(&str, u32)]) -> String {
        let mut state = self.shop.lock().await;
        let id = state.next_id("cart");
        let cart = Cart {
            id: id.clone(),
            lines: lines
                .iter()
                .map(|(product, count)| ((*product).to_string(), *count))
                .collect(),
        };
        state.carts.insert(user_id.to_string(), cart);
        id
    }

    /// A user's cart lines as the server holds them.
    pub async fn cart_lines(&self, user_id: &str) -> Vec<(String, u32)> {
        self.shop
            .lock()
            .await
            .carts
            .get(user_id)
            .map(|cart| cart.lines.clone())
            .unwrap_or_default()
    }

    /// Save `product_ids` in a user's wishlist.
    pub async fn seed_wishlist(&self, user_id: &str, product_ids: &[&str]) {
        self.shop.lock().await.wishlists.insert(
            user_id.to_string(),
            product_ids.iter().map(ToString::to_string).collect(),
        );
    }

    /// A user's wishlist as the server holds it.
    pub async fn wishlist_ids(&self, user_id: &str) -> Vec<String> {
        self.shop
            .lock()
            .await
            .wishlists
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of orders a user has placed.
    pub async fn order_count(&self, user_id: &str) -> usize {
        self.shop
            .lock()
            .await
            .orders
            .iter()
            .filter(|order| order.user_id == user_id)
            .count()
    }

    /// IDs of the whole seed catalog, in listing order.
    pub async fn product_ids(&self) -> Vec<String> {
        self.shop
            .lock()
            .await
            .products
            .iter()
            .filter_map(|p| p["_id"].as_str().map(String::from))
            .collect()
    }

    /// Server-side unit price of a product.
    pub async fn price_of(&self, product_id: &str) -> Decimal {
        Decimal::from(self.shop.lock().await.price_of(product_id))
    }

    /// Configuration pointing at this mock.
    ///
    /// # Panics
    ///
    /// Panics if the mock URL is rejected, which would be a bug here.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        let url = self.url.clone();
        StorefrontConfig::from_vars(move |key| match key {
            "SHOPMART_API_BASE_URL" => Some(url.clone()),
            "SHOPMART_RETURN_URL" => Some(RETURN_URL.to_string()),
            "SHOPMART_HTTP_TIMEOUT_SECS" => Some("5".to_string()),
            "SHOPMART_PAGE_SIZE" => Some("5".to_string()),
            _ => None,
        })
        .expect("Mock configuration is valid")
    }

    /// A storefront talking to this mock. Call from within a Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn storefront(&self) -> Storefront {
        Storefront::new(self.config()).expect("Failed to build storefront")
    }
}

#[allow(clippy::print_stderr)]
fn report_stopped(error: &std::io::Error) {
    eprintln!("mock server stopped: {error}");
}

/// Create an account on the mock and sign in through the auth service.
/// Returns the user ID once both synchronizers have finished loading.
///
/// # Panics
///
/// Panics if sign-in fails.
pub async fn sign_in(mock: &MockShop, storefront: &Storefront, email: &str) -> String {
    let user_id = mock.add_account("Mona Adel", email, "secret1").await;
    storefront
        .auth()
        .login(email, "secret1")
        .await
        .expect("Sign-in against the mock failed");

    // Queued behind the sign-in refresh, so both tasks are idle afterwards
    storefront.cart().refresh().await.expect("Cart task stopped");
    storefront
        .wishlist()
        .refresh()
        .await
        .expect("Wishlist task stopped");
    user_id
}

/// Wait until the watched state satisfies `predicate`.
///
/// # Panics
///
/// Panics if it does not within a few seconds.
pub async fn settle<T>(rx: &mut watch::Receiver<T>, predicate: impl FnMut(&T) -> bool) {
    tokio::time::timeout(SETTLE_TIMEOUT, rx.wait_for(predicate))
        .await
        .expect("Timed out waiting for state")
        .expect("Synchronizer stopped");
}

/// Next published notification.
///
/// # Panics
///
/// Panics if none arrives within a few seconds.
pub async fn next_notification(rx: &mut broadcast::Receiver<Notification>) -> Notification {
    tokio::time::timeout(SETTLE_TIMEOUT, rx.recv())
        .await
        .expect("Timed out waiting for a notification")
        .expect("Notifier closed")
}
