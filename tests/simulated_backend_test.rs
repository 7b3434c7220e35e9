use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use storekeep::application::store::PendingCounts;
use storekeep::domain::product::Product;
use storekeep::infrastructure::in_memory::InMemoryBackend;
use storekeep::{BackendFailure, PurchaseBackend, Store, StoreError, event_channel};
use tokio::sync::oneshot;

fn running_store() -> Store<InMemoryBackend> {
    let (sink, stream) = event_channel::<InMemoryBackend>();
    let catalog = vec![
        Product::new("com.example.gems", dec!(0.99), Some("USD")),
        Product::new("com.example.coins", dec!(4.99), Some("EUR")),
    ];
    let store = Store::new(InMemoryBackend::new(catalog, sink));
    store.spawn_event_loop(stream);
    store
}

#[tokio::test]
async fn test_redelivery_does_not_complete_twice() {
    let store = running_store();
    store.backend().set_lose_acknowledgements(true);
    let calls = Arc::new(AtomicUsize::new(0));

    let (tx, rx) = oneshot::channel();
    let counter = Arc::clone(&calls);
    store.purchase_product_with("com.example.gems", move |result| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(result);
    });
    let payment = rx.await.unwrap().unwrap();
    assert_eq!(payment.amount, dec!(0.99));

    // The acknowledgement was lost, so the purchase is still queued at the backend.
    assert_eq!(store.backend().unfinished_count(), 1);
    let purchase = store.backend().acknowledged()[0].clone();

    store.backend().set_lose_acknowledgements(false);
    store.backend().redeliver_unfinished();
    // Events are handled in order, so a restore round trip waits for the redelivery.
    let restored = store.restore_purchases().await.unwrap();
    assert_eq!(restored, vec!["com.example.gems"]);

    let acknowledged = store.backend().acknowledged();
    assert_eq!(acknowledged.len(), 3);
    assert_eq!(acknowledged[1], purchase);
    assert_eq!(store.backend().unfinished_count(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_transactions_left_from_earlier_run_are_acknowledged() {
    let (sink, stream) = event_channel::<InMemoryBackend>();
    let catalog = vec![Product::new("com.example.gems", dec!(0.99), Some("USD"))];
    let backend = InMemoryBackend::new(catalog.clone(), sink);
    // Bought while nothing was listening.
    backend.purchase(&catalog[0]).unwrap();
    assert_eq!(backend.unfinished_count(), 1);

    let store = Store::new(backend);
    store.spawn_event_loop(stream);
    let restored = store.restore_purchases().await.unwrap();

    assert_eq!(restored, vec!["com.example.gems"]);
    assert_eq!(store.backend().unfinished_count(), 0);
    // The stale purchase and the restored copy.
    assert_eq!(store.backend().acknowledged().len(), 2);
    assert_eq!(store.pending_counts(), PendingCounts::default());
}

#[tokio::test]
async fn test_concurrent_purchases_of_distinct_products() {
    let store = running_store();

    let (gems, coins) = tokio::join!(
        store.purchase_product("com.example.gems"),
        store.purchase_product("com.example.coins")
    );

    assert_eq!(gems.unwrap().currency, "USD");
    assert_eq!(coins.unwrap().currency, "EUR");
    assert_eq!(store.backend().submitted_purchases().len(), 2);
}

#[tokio::test]
async fn test_duplicate_async_purchase_reports_dropped_completion() {
    let store = running_store();

    let (first, second) = tokio::join!(
        store.purchase_product("com.example.gems"),
        store.purchase_product("com.example.gems")
    );

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), StoreError::CompletionDropped);
    assert_eq!(store.backend().submitted_purchases(), vec!["com.example.gems"]);
}

#[tokio::test]
async fn test_concurrent_fetches_each_resolve() {
    let store = running_store();

    let (first, second) = tokio::join!(
        store.get_product("com.example.gems"),
        store.get_product("com.example.gems")
    );

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(store.backend().issued_requests().len(), 2);
}

#[tokio::test]
async fn test_restore_failure_through_event_loop() {
    let store = running_store();
    store.backend().fail_restore(BackendFailure::new(7, "offline"));

    let err = store.restore_purchases().await.unwrap_err();
    assert_eq!(err, StoreError::Restore(BackendFailure::new(7, "offline")));
}

#[tokio::test]
async fn test_failed_purchase_then_success() {
    let store = running_store();
    store
        .backend()
        .fail_purchases("com.example.coins", BackendFailure::new(2, "cancelled"));

    let failed = store.purchase_product("com.example.coins").await;
    assert!(matches!(failed, Err(StoreError::Transaction(_))));

    let paid = store.purchase_product("com.example.gems").await.unwrap();
    assert_eq!(paid.amount, dec!(0.99));

    let restored = store.restore_purchases().await.unwrap();
    assert_eq!(restored, vec!["com.example.gems"]);
}
