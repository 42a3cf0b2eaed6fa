//! Fetch ordering on a multi-thread runtime.
//!
//! A tracing layer holds the first "publishing column snapshot" event for a
//! while, so a second fetch is issued while the first one is mid-publish.

mod common;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use column_store::core::{
    store::ColumnStore,
    types::{LoadState, Snapshot},
};
use common::{column, FakeApi};
use tracing::{
    field::{Field, Visit},
    Event, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    util::SubscriberInitExt,
    Layer,
};

static STALLED: AtomicBool = AtomicBool::new(false);

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

struct StallFirstPublish;

impl<S: Subscriber> Layer<S> for StallFirstPublish {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        if visitor.0.contains("publishing column snapshot") && !STALLED.swap(true, Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(300));
        }
    }
}

fn ids(snapshot: &Snapshot) -> Vec<u64> {
    snapshot.columns.iter().map(|c| c.id).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn latest_fetch_wins_when_an_older_publish_stalls() {
    let _ = tracing_subscriber::registry().with(StallFirstPublish).try_init();

    let api = Arc::new(FakeApi::default());
    api.script_list(Ok(vec![column(1, "old", false)]));
    api.script_list(Ok(vec![column(2, "new", false)]));
    let store = ColumnStore::new(api.clone());

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.fetch().await }
    });
    while !STALLED.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let second = store.fetch().await;
    let first = first.await.unwrap();

    assert_eq!(second.as_ref().map(ids), Some(vec![2]));
    let snap = store.get();
    assert_eq!(snap.state, LoadState::Done);
    assert_eq!(ids(&snap), vec![2]);
    // The older fetch either landed before the newer one began, or not at all.
    if let Some(first) = first {
        assert_eq!(ids(&first), vec![1]);
    }
    assert!(!store.is_fetching());
}
