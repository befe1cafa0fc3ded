//! Integration tests for the wishlist synchronizer against the mock API.

use std::time::Duration;

use shopmart_core::ProductId;
use shopmart_integration_tests::{MockShop, next_notification, settle, sign_in};
use shopmart_storefront::sync::{NotificationLevel, SyncError, ToggleOutcome};

#[tokio::test]
async fn test_sign_in_loads_saved_products() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    let user_id = mock
        .add_account("Mona Adel", "mona@example.com", "secret1")
        .await;
    mock.seed_wishlist(&user_id, &[ids[2].as_str(), ids[7].as_str()])
        .await;

    let mut state = storefront.wishlist().subscribe();
    storefront
        .auth()
        .login("mona@example.com", "secret1")
        .await
        .expect("login failed");
    settle(&mut state, |s| s.count == 2).await;

    let wishlist = storefront.wishlist();
    assert!(wishlist.contains(&ProductId::new(&ids[2])));
    assert!(wishlist.contains(&ProductId::new(&ids[7])));
    assert!(!wishlist.contains(&ProductId::new(&ids[0])));
    let titles: Vec<String> = wishlist
        .state()
        .records
        .iter()
        .map(|p| p.title.clone())
        .collect();
    assert_eq!(titles, vec!["Woman Long Dress", "Galaxy A54 5G"]);
}

#[tokio::test]
async fn test_toggle_adds_then_removes() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    let user_id = sign_in(&mock, &storefront, "mona@example.com").await;
    let mut notes = storefront.notifier().subscribe();
    let product = ProductId::new(&ids[3]);
    let wishlist = storefront.wishlist();

    let outcome = wishlist.toggle(&product).await.expect("toggle failed");
    assert_eq!(outcome, ToggleOutcome::Added);
    assert!(wishlist.contains(&product));
    assert_eq!(wishlist.count(), 1, "records refreshed after add");
    assert_eq!(mock.wishlist_ids(&user_id).await, vec![ids[3].clone()]);
    assert_eq!(next_notification(&mut notes).await.message, "Added to wishlist");

    let outcome = wishlist.toggle(&product).await.expect("toggle failed");
    assert_eq!(outcome, ToggleOutcome::Removed);
    assert!(!wishlist.contains(&product));
    assert_eq!(wishlist.count(), 0);
    assert!(mock.wishlist_ids(&user_id).await.is_empty());
    let note = next_notification(&mut notes).await;
    assert_eq!(note.level, NotificationLevel::Success);
    assert_eq!(note.message, "Removed from wishlist");
}

#[tokio::test]
async fn test_removal_does_not_refetch() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    let user_id = mock
        .add_account("Mona Adel", "mona@example.com", "secret1")
        .await;
    mock.seed_wishlist(&user_id, &[ids[0].as_str(), ids[1].as_str()])
        .await;
    storefront
        .auth()
        .login("mona@example.com", "secret1")
        .await
        .expect("login failed");
    storefront.wishlist().refresh().await.expect("task stopped");
    let fetches = mock.hits("GET /wishlist").await;

    storefront
        .wishlist()
        .toggle(&ProductId::new(&ids[0]))
        .await
        .expect("toggle failed");
    assert_eq!(mock.hits("GET /wishlist").await, fetches);
    assert_eq!(storefront.wishlist().count(), 1);
}

#[tokio::test]
async fn test_failed_toggle_keeps_state() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    sign_in(&mock, &storefront, "mona@example.com").await;
    let wishlist = storefront.wishlist();
    let product = ProductId::new(&ids[5]);
    wishlist.toggle(&product).await.expect("toggle failed");
    let before = wishlist.state();
    let mut notes = storefront.notifier().subscribe();

    mock.fail_next("DELETE /wishlist/{product_id}", 502).await;
    let err = wishlist.toggle(&product).await.expect_err("failure ignored");
    assert!(matches!(err, SyncError::Remote(_)));
    assert_eq!(wishlist.state(), before);

    let note = next_notification(&mut notes).await;
    assert_eq!(note.level, NotificationLevel::Error);
    assert_eq!(note.message, "Injected failure");
}

#[tokio::test]
async fn test_failed_refresh_empties_wishlist() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    sign_in(&mock, &storefront, "mona@example.com").await;
    storefront
        .wishlist()
        .toggle(&ProductId::new(&ids[0]))
        .await
        .expect("toggle failed");

    mock.fail_next("GET /wishlist", 500).await;
    let records = storefront.wishlist().refresh().await.expect("task stopped");
    assert!(records.is_empty());
    assert!(storefront.wishlist().state().ids.is_empty());
}

#[tokio::test]
async fn test_signed_out_toggle_is_refused() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    let mut notes = storefront.notifier().subscribe();

    let err = storefront
        .wishlist()
        .toggle(&ProductId::new(&ids[0]))
        .await
        .expect_err("signed-out toggle accepted");
    assert!(matches!(err, SyncError::NotSignedIn));
    assert_eq!(next_notification(&mut notes).await.message, "Please login first");
    assert_eq!(mock.total_hits().await, 0);
}

#[tokio::test]
async fn test_sign_out_empties_wishlist_without_requests() {
    let mock = MockShop::start().await;
    let storefront = mock.storefront();
    let ids = mock.product_ids().await;
    sign_in(&mock, &storefront, "mona@example.com").await;
    storefront
        .wishlist()
        .toggle(&ProductId::new(&ids[0]))
        .await
        .expect("toggle failed");

    let hits = mock.total_hits().await;
    let mut state = storefront.wishlist().subscribe();
    storefront.auth().logout();
    settle(&mut state, |s| s.count == 0 && s.ids.is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mock.total_hits().await, hits);
}
