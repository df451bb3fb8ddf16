mod support;

use std::time::Duration;

use feed_core::Item;
use feed_engine::{ingestion_channel, SinkReport, SinkWorker};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use support::RecordingStore;

fn batch(titles: &[&str]) -> Vec<Item> {
    titles
        .iter()
        .map(|title| Item::new("author", *title, 1))
        .collect()
}

#[tokio::test]
async fn failed_save_drops_only_that_item() {
    let store = RecordingStore::failing_on(&["b"]);
    let (tx, rx) = ingestion_channel(8);
    let cancel = CancellationToken::new();
    let worker = tokio::spawn(SinkWorker::new(store.clone(), rx).run(cancel.clone()));

    let report = tx
        .dispatch(batch(&["a", "b", "c"]), Duration::from_secs(1), &cancel)
        .await;
    assert_eq!(report.dispatched, 3);
    drop(tx);

    let sink_report = worker.await.unwrap();
    assert_eq!(sink_report, SinkReport { saved: 2, dropped: 1 });
    assert_eq!(store.attempts(), vec!["a", "b", "c"]);
    assert_eq!(store.saved(), batch(&["a", "c"]));
}

#[tokio::test]
async fn cancellation_drains_buffered_items() {
    let store = RecordingStore::new();
    let (tx, rx) = ingestion_channel(8);
    let producer_cancel = CancellationToken::new();
    tx.dispatch(batch(&["x", "y"]), Duration::from_secs(1), &producer_cancel)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    // The sender is still alive; only cancellation ends the worker.
    let report = SinkWorker::new(store.clone(), rx).run(cancel).await;
    assert_eq!(report.saved, 2);
    assert_eq!(store.saved(), batch(&["x", "y"]));
    drop(tx);
}

#[tokio::test]
async fn pages_are_stored_in_arrival_order() {
    let store = RecordingStore::new();
    let (tx, rx) = ingestion_channel(2);
    let cancel = CancellationToken::new();
    let worker = tokio::spawn(SinkWorker::new(store.clone(), rx).run(cancel.clone()));

    tx.dispatch(batch(&["p1-a", "p1-b", "p1-c"]), Duration::from_secs(5), &cancel)
        .await;
    tx.dispatch(batch(&["p2-a"]), Duration::from_secs(5), &cancel)
        .await;
    drop(tx);

    worker.await.unwrap();
    assert_eq!(store.saved(), batch(&["p1-a", "p1-b", "p1-c", "p2-a"]));
}
