//! Integration tests for checkout and order history.

use rust_decimal::Decimal;

use shopmart_core::{CheckoutMethod, PaymentMethod, ProductId};
use shopmart_integration_tests::{MockShop, RETURN_URL, sign_in};
use shopmart_storefront::api::ShippingAddress;
use shopmart_storefront::services::checkout::shipping_address;
use shopmart_storefront::services::{CheckoutError, CheckoutOutcome};

fn address() -> ShippingAddress {
    shipping_address("12 Tahrir St", "01012345678", "Cairo").expect("address rejected")
}

#[tokio::test]
async fn test_cash_order_clears_cart() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    let user_id = sign_in(&mock, &storefront, "mona@example.com").await;
    let product = ProductId::new(&ids[6]);
    storefront.cart().add_item(&product).await.expect("add failed");
    storefront
        .cart()
        .set_quantity(&product, 2)
        .await
        .expect("update failed");

    let outcome = storefront
        .checkout()
        .checkout(CheckoutMethod::Cash, &address())
        .await
        .expect("checkout failed");
    let CheckoutOutcome::Placed(order) = outcome else {
        panic!("cash checkout should place an order");
    };
    assert_eq!(order.payment_method_type, PaymentMethod::Cash);
    assert_eq!(
        order.total_order_price,
        mock.price_of(&ids[6]).await * Decimal::from(2)
    );
    assert_eq!(
        order.shipping_address.as_ref().map(|a| a.city.as_str()),
        Some("Cairo")
    );

    assert!(storefront.cart().snapshot().is_empty());
    assert_eq!(storefront.cart().item_count(), 0);
    assert_eq!(mock.order_count(&user_id).await, 1);
}

#[tokio::test]
async fn test_order_history_is_newest_first() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    sign_in(&mock, &storefront, "mona@example.com").await;

    let mut placed = Vec::new();
    for index in [0, 7] {
        storefront
            .cart()
            .add_item(&ProductId::new(&ids[index]))
            .await
            .expect("add failed");
        let outcome = storefront
            .checkout()
            .checkout(CheckoutMethod::Cash, &address())
            .await
            .expect("checkout failed");
        if let CheckoutOutcome::Placed(order) = outcome {
            placed.push(order.id);
        }
    }

    let history = storefront
        .checkout()
        .order_history()
        .await
        .expect("history failed");
    let newest_first: Vec<_> = placed.into_iter().rev().collect();
    assert_eq!(
        history.iter().map(|o| o.id.clone()).collect::<Vec<_>>(),
        newest_first
    );
    assert!(history[0].created_at > history[1].created_at);
}

#[tokio::test]
async fn test_online_checkout_redirects() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    let user_id = sign_in(&mock, &storefront, "mona@example.com").await;
    storefront
        .cart()
        .add_item(&ProductId::new(&ids[8]))
        .await
        .expect("add failed");

    let outcome = storefront
        .checkout()
        .checkout(CheckoutMethod::Online, &address())
        .await
        .expect("checkout failed");
    let CheckoutOutcome::Redirect(url) = outcome else {
        panic!("online checkout should redirect");
    };
    assert_eq!(url.host_str(), Some("checkout.stripe.test"));
    assert!(
        url.query_pairs()
            .any(|(key, value)| key == "success_url" && value.starts_with(RETURN_URL))
    );

    assert_eq!(storefront.cart().item_count(), 1, "cart kept until paid");
    assert_eq!(mock.order_count(&user_id).await, 0);
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    sign_in(&mock, &storefront, "mona@example.com").await;

    let err = storefront
        .checkout()
        .checkout(CheckoutMethod::Cash, &address())
        .await
        .expect_err("empty cart accepted");
    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(mock.hits("POST /orders/{cart_id}").await, 0);
}

#[tokio::test]
async fn test_signed_out_checkout_is_refused() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();

    let err = storefront
        .checkout()
        .checkout(CheckoutMethod::Online, &address())
        .await
        .expect_err("signed-out checkout accepted");
    assert!(matches!(err, CheckoutError::NotSignedIn));

    let err = storefront
        .checkout()
        .order_history()
        .await
        .expect_err("signed-out history returned");
    assert!(matches!(err, CheckoutError::NotSignedIn));
    assert_eq!(mock.total_hits().await, 0);
}
