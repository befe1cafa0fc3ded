//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// How an order was (or will be) paid, as reported by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cash,
    /// Card payment through the hosted payment page.
    Card,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Card => write!(f, "card"),
        }
    }
}

/// Checkout method chosen by the shopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMethod {
    /// Place the order immediately, pay on delivery.
    #[default]
    Cash,
    /// Open a hosted payment session and redirect the shopper to it.
    Online,
}

impl CheckoutMethod {
    /// The payment method the resulting order will carry.
    #[must_use]
    pub const fn payment_method(self) -> PaymentMethod {
        match self {
            Self::Cash => PaymentMethod::Cash,
            Self::Online => PaymentMethod::Card,
        }
    }
}

impl std::fmt::Display for CheckoutMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Online => write!(f, "online"),
        }
    }
}

impl std::str::FromStr for CheckoutMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(Self::Cash),
            "online" | "card" => Ok(Self::Online),
            _ => Err(format!("invalid checkout method: {s}")),
        }
    }
}

/// Order progress derived from the remote `isPaid` / `isDelivered` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderProgress {
    /// Neither paid nor delivered.
    Pending,
    /// Paid, awaiting delivery.
    Paid,
    /// Delivered, payment collected on delivery or outstanding.
    Delivered,
    /// Paid and delivered.
    Completed,
}

impl OrderProgress {
    /// Combine the two remote flags.
    #[must_use]
    pub const fn from_flags(is_paid: bool, is_delivered: bool) -> Self {
        match (is_paid, is_delivered) {
            (false, false) => Self::Pending,
            (true, false) => Self::Paid,
            (false, true) => Self::Delivered,
            (true, true) => Self::Completed,
        }
    }
}

/// Role claimed by the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_method_parse() {
        assert_eq!("cash".parse::<CheckoutMethod>(), Ok(CheckoutMethod::Cash));
        assert_eq!("online".parse::<CheckoutMethod>(), Ok(CheckoutMethod::Online));
        assert!("bitcoin".parse::<CheckoutMethod>().is_err());
    }

    #[test]
    fn test_checkout_method_maps_to_payment_method() {
        assert_eq!(CheckoutMethod::Cash.payment_method(), PaymentMethod::Cash);
        assert_eq!(CheckoutMethod::Online.payment_method(), PaymentMethod::Card);
    }

    #[test]
    fn test_payment_method_wire_format() {
        let method: PaymentMethod = serde_json::from_str("\"card\"").unwrap();
        assert_eq!(method, PaymentMethod::Card);
    }

    #[test]
    fn test_order_progress_from_flags() {
        assert_eq!(OrderProgress::from_flags(false, false), OrderProgress::Pending);
        assert_eq!(OrderProgress::from_flags(true, false), OrderProgress::Paid);
        assert_eq!(OrderProgress::from_flags(true, true), OrderProgress::Completed);
    }
}
