//! Response envelopes as the remote API sends them.
//!
//! Nothing here leaves the `api` module; the client unwraps each envelope
//! into the types in [`super::types`].

use rust_decimal::Decimal;
use serde::Deserialize;

use shopmart_core::{CartId, ProductId};

use super::types::{CartSnapshot, LineItem, Pagination};

/// Body of every cart read and mutation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    #[serde(default)]
    pub num_of_cart_items: Option<u32>,
    #[serde(default)]
    pub cart_id: Option<CartId>,
    #[serde(default)]
    pub data: Option<CartData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartData {
    #[serde(rename = "_id")]
    pub id: CartId,
    #[serde(default)]
    pub products: Vec<LineItem>,
    #[serde(default)]
    pub total_cart_price: Decimal,
}

impl CartResponse {
    /// Item count the server claims, for comparison with the line count.
    pub const fn reported_count(&self) -> Option<u32> {
        self.num_of_cart_items
    }

    pub fn into_snapshot(self) -> CartSnapshot {
        match self.data {
            Some(data) => CartSnapshot {
                id: Some(data.id),
                items: data.products,
                total: data.total_cart_price,
            },
            None => CartSnapshot {
                id: self.cart_id,
                ..CartSnapshot::empty()
            },
        }
    }
}

/// Paged or plain list body: `{ results, metadata, data: [...] }`.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub metadata: Option<Pagination>,
    pub data: Vec<T>,
}

/// Single record body: `{ data: {...} }`.
#[derive(Debug, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Wishlist add/remove acknowledgment: the saved IDs, no records.
#[derive(Debug, Deserialize)]
pub struct WishlistAck {
    #[serde(default)]
    pub data: Vec<ProductId>,
}

/// Hosted payment session body: `{ session: { url } }`.
#[derive(Debug, Deserialize)]
pub struct CheckoutSessionResponse {
    pub session: CheckoutSession,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub url: Option<String>,
}

/// Status-only body used by the reset code endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    /// Whether either status field reports success.
    pub fn is_success(&self) -> bool {
        [&self.status, &self.status_msg]
            .into_iter()
            .flatten()
            .any(|s| s.eq_ignore_ascii_case("success"))
    }
}

/// Error body. Plain failures carry `message`; validation failures carry
/// `errors.msg` with the field-level reason.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<FieldError>,
}

#[derive(Debug, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub msg: Option<String>,
}

impl ErrorBody {
    /// Best human-readable message in a failed response body.
    pub fn message(self) -> String {
        self.errors
            .and_then(|e| e.msg)
            .or(self.message)
            .filter(|m| !m.is_empty() && m != "fail")
            .unwrap_or_default()
    }

    /// Extract the message from raw body text, tolerating non-JSON bodies.
    pub fn from_text(text: &str) -> String {
        serde_json::from_str::<Self>(text)
            .map(Self::message)
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_cart_response_into_snapshot() {
        let response: CartResponse = serde_json::from_value(json!({
            "status": "success",
            "numOfCartItems": 1,
            "cartId": "c1",
            "data": {
                "_id": "c1",
                "cartOwner": "u1",
                "products": [{ "_id": "l1", "count": 1, "price": 100, "product": "P1" }],
                "totalCartPrice": 100
            }
        }))
        .unwrap();
        assert_eq!(response.reported_count(), Some(1));
        let snapshot = response.into_snapshot();
        assert_eq!(snapshot.id, Some(CartId::new("c1")));
        assert_eq!(snapshot.item_count(), 1);
        assert_eq!(snapshot.total, Decimal::from(100));
    }

    #[test]
    fn test_cart_response_without_data() {
        let response: CartResponse =
            serde_json::from_value(json!({ "message": "success" })).unwrap();
        assert_eq!(response.into_snapshot(), CartSnapshot::empty());
    }

    #[test]
    fn test_error_body_prefers_field_message() {
        let text = r#"{"message":"fail","errors":{"value":"x","msg":"Account Already Exists","param":"email"}}"#;
        assert_eq!(ErrorBody::from_text(text), "Account Already Exists");

        let text = r#"{"statusMsg":"fail","message":"Incorrect email or password"}"#;
        assert_eq!(ErrorBody::from_text(text), "Incorrect email or password");

        assert_eq!(ErrorBody::from_text("<html>Bad Gateway</html>"), "");
        assert_eq!(ErrorBody::from_text(r#"{"message":"fail"}"#), "");
    }

    #[test]
    fn test_status_response_success() {
        let ok: StatusResponse = serde_json::from_value(json!({ "status": "Success" })).unwrap();
        assert!(ok.is_success());
        let ok: StatusResponse = serde_json::from_value(json!({
            "statusMsg": "success",
            "message": "Reset code sent to your email"
        }))
        .unwrap();
        assert!(ok.is_success());
        let bad: StatusResponse = serde_json::from_value(json!({ "statusMsg": "fail" })).unwrap();
        assert!(!bad.is_success());
    }
}
