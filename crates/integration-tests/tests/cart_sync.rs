//! Integration tests for the cart synchronizer against the mock API.

use std::time::Duration;

use rust_decimal::Decimal;

use shopmart_core::ProductId;
use shopmart_integration_tests::{MockShop, next_notification, settle, sign_in};
use shopmart_storefront::sync::{NotificationLevel, SyncError};

#[tokio::test]
async fn test_sign_in_loads_existing_cart() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    let user_id = mock
        .add_account("Mona Adel", "mona@example.com", "secret1")
        .await;
    let cart_id = mock
        .seed_cart(&user_id, &[(ids[0].as_str(), 1), (ids[1].as_str(), 3)])
        .await;

    let mut state = storefront.cart().subscribe();
    storefront
        .auth()
        .login("mona@example.com", "secret1")
        .await
        .expect("login failed");
    settle(&mut state, |s| s.item_count == 2).await;

    let snapshot = storefront.cart().snapshot();
    assert_eq!(snapshot.id.as_ref().map(|id| id.as_str()), Some(cart_id.as_str()));
    let line = snapshot.line(&ProductId::new(&ids[1])).expect("line missing");
    assert_eq!(line.quantity, 3);
    assert!(line.product.details().is_some(), "GET /cart populates products");

    let expected =
        mock.price_of(&ids[0]).await + mock.price_of(&ids[1]).await * Decimal::from(3);
    assert_eq!(snapshot.total, expected);
}

#[tokio::test]
async fn test_add_update_remove() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    let user_id = sign_in(&mock, &storefront, "mona@example.com").await;
    let mut notes = storefront.notifier().subscribe();
    let product = ProductId::new(&ids[4]);
    let cart = storefront.cart();

    cart.add_item(&product).await.expect("add failed");
    let snapshot = cart.add_item(&product).await.expect("add failed");
    assert_eq!(snapshot.item_count(), 1);
    assert_eq!(snapshot.line(&product).map(|l| l.quantity), Some(2));
    assert_eq!(cart.item_count(), 1);
    assert_eq!(next_notification(&mut notes).await.message, "Added to cart");
    assert_eq!(next_notification(&mut notes).await.message, "Added to cart");

    let snapshot = cart.set_quantity(&product, 5).await.expect("update failed");
    assert_eq!(snapshot.line(&product).map(|l| l.quantity), Some(5));
    assert_eq!(snapshot.total, mock.price_of(&ids[4]).await * Decimal::from(5));
    assert_eq!(mock.cart_lines(&user_id).await, vec![(ids[4].clone(), 5)]);

    let snapshot = cart.remove_item(&product).await.expect("remove failed");
    assert!(snapshot.is_empty());
    assert_eq!(cart.item_count(), 0);
    let note = next_notification(&mut notes).await;
    assert_eq!(note.level, NotificationLevel::Success);
    assert_eq!(note.message, "Removed from cart");
}

#[tokio::test]
async fn test_failed_add_keeps_cart_and_notifies() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    sign_in(&mock, &storefront, "mona@example.com").await;
    let cart = storefront.cart();

    let before = cart.add_item(&ProductId::new(&ids[0])).await.expect("add failed");
    let mut notes = storefront.notifier().subscribe();

    mock.fail_next("POST /cart", 500).await;
    let err = cart
        .add_item(&ProductId::new(&ids[1]))
        .await
        .expect_err("injected failure ignored");
    assert!(matches!(err, SyncError::Remote(_)));
    assert_eq!(cart.snapshot(), before);
    assert!(!cart.is_adding());

    let note = next_notification(&mut notes).await;
    assert_eq!(note.level, NotificationLevel::Error);
    assert_eq!(note.message, "Injected failure");
}

#[tokio::test]
async fn test_unknown_product_reports_remote_message() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    sign_in(&mock, &storefront, "mona@example.com").await;
    let mut notes = storefront.notifier().subscribe();

    let err = storefront
        .cart()
        .add_item(&ProductId::new("no-such-product"))
        .await
        .expect_err("unknown product accepted");
    assert!(matches!(err, SyncError::Remote(_)));
    assert_eq!(
        next_notification(&mut notes).await.message,
        "No product for this id no-such-product"
    );
}

#[tokio::test]
async fn test_concurrent_adds_are_applied_in_order() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    let user_id = sign_in(&mock, &storefront, "mona@example.com").await;
    let cart = storefront.cart();
    let (a, b) = (ProductId::new(&ids[0]), ProductId::new(&ids[1]));

    let (first, second, third) =
        tokio::join!(cart.add_item(&a), cart.add_item(&b), cart.add_item(&a));
    first.expect("add failed");
    second.expect("add failed");
    third.expect("add failed");

    let snapshot = cart.snapshot();
    assert_eq!(snapshot.item_count(), 2);
    assert_eq!(snapshot.total_units(), 3);
    assert_eq!(snapshot.line(&a).map(|l| l.quantity), Some(2));
    assert_eq!(mock.cart_lines(&user_id).await.len(), 2);
}

#[tokio::test]
async fn test_quantity_below_one_is_rejected_locally() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    sign_in(&mock, &storefront, "mona@example.com").await;
    let product = ProductId::new(&ids[0]);
    storefront.cart().add_item(&product).await.expect("add failed");

    for quantity in [0, -3] {
        let err = storefront
            .cart()
            .set_quantity(&product, quantity)
            .await
            .expect_err("quantity accepted");
        assert!(matches!(err, SyncError::InvalidQuantity(q) if q == quantity));
    }
    assert_eq!(mock.hits("PUT /cart/{product_id}").await, 0);
    assert_eq!(storefront.cart().snapshot().line(&product).map(|l| l.quantity), Some(1));
}

#[tokio::test]
async fn test_signed_out_mutations_do_not_reach_the_server() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    let mut notes = storefront.notifier().subscribe();

    let err = storefront
        .cart()
        .add_item(&ProductId::new(&ids[0]))
        .await
        .expect_err("signed-out add accepted");
    assert!(matches!(err, SyncError::NotSignedIn));
    assert_eq!(next_notification(&mut notes).await.message, "Please login first");
    assert_eq!(mock.total_hits().await, 0);
}

#[tokio::test]
async fn test_sign_out_empties_cart_without_requests() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    let user_id = sign_in(&mock, &storefront, "mona@example.com").await;
    storefront
        .cart()
        .add_item(&ProductId::new(&ids[0]))
        .await
        .expect("add failed");

    let hits = mock.total_hits().await;
    let mut state = storefront.cart().subscribe();
    assert!(storefront.auth().logout());
    settle(&mut state, |s| s.item_count == 0 && s.snapshot.is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(mock.total_hits().await, hits);
    assert_eq!(mock.cart_lines(&user_id).await.len(), 1, "server cart kept");
}

#[tokio::test]
async fn test_switching_accounts_replaces_cart() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    sign_in(&mock, &storefront, "mona@example.com").await;
    storefront
        .cart()
        .add_item(&ProductId::new(&ids[0]))
        .await
        .expect("add failed");

    let other = mock
        .add_account("Omar Said", "omar@example.com", "secret1")
        .await;
    mock.seed_cart(
        &other,
        &[(ids[2].as_str(), 1), (ids[3].as_str(), 1), (ids[5].as_str(), 2)],
    )
        .await;

    let mut state = storefront.cart().subscribe();
    storefront
        .auth()
        .login("omar@example.com", "secret1")
        .await
        .expect("login failed");
    settle(&mut state, |s| s.item_count == 3).await;
    assert!(storefront.cart().snapshot().line(&ProductId::new(&ids[0])).is_none());
}

#[tokio::test]
async fn test_clear_empties_even_when_server_fails() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    let user_id = sign_in(&mock, &storefront, "mona@example.com").await;
    let cart = storefront.cart();

    cart.add_item(&ProductId::new(&ids[0])).await.expect("add failed");
    cart.clear().await.expect("clear failed");
    assert!(cart.snapshot().is_empty());
    assert!(mock.cart_lines(&user_id).await.is_empty());

    cart.add_item(&ProductId::new(&ids[1])).await.expect("add failed");
    mock.fail_next("DELETE /cart", 503).await;
    cart.clear().await.expect("clear failed");
    assert!(cart.snapshot().is_empty());
    assert_eq!(mock.cart_lines(&user_id).await.len(), 1);
}

#[tokio::test]
async fn test_failed_refresh_empties_cart_silently() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    sign_in(&mock, &storefront, "mona@example.com").await;
    storefront
        .cart()
        .add_item(&ProductId::new(&ids[0]))
        .await
        .expect("add failed");
    let mut notes = storefront.notifier().subscribe();

    mock.fail_next("GET /cart", 500).await;
    let snapshot = storefront.cart().refresh().await.expect("task stopped");
    assert!(snapshot.is_empty());
    assert!(notes.try_recv().is_err(), "refresh failures are silent");

    let snapshot = storefront.cart().refresh().await.expect("task stopped");
    assert_eq!(snapshot.item_count(), 1);
}
