//! End-to-end tests: journal writes flowing through publishers to subscribers.

use eventide_core::{
    Config, EntryBatch, EventSourced, PublisherConfig, Repository, Runtime, SourceEvent, Sourced,
    StreamCategory, StreamQuery, TypeRegistry, NO_STREAM_VERSION,
};
use eventide_journal::category_stream_for;
use eventide_testkit::{batch_of, wait_until, RecordingSubscriber, DEFAULT_WAIT};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn runtime() -> Runtime {
    Runtime::new(Config::new().poll_every(Duration::from_millis(5)))
}

#[test]
fn journal_to_subscriber() {
    let runtime = runtime();
    let journal = runtime.open_journal("test-journal");
    let publisher = runtime
        .publish("test-journal", "test-bus", "test-topic")
        .unwrap();

    let mut batch = EntryBatch::new();
    for i in 0..3 {
        batch.add_entry("test1type", format!("test1instance{i}"));
    }
    journal.write("s1", NO_STREAM_VERSION, &batch).unwrap();

    let subscriber = RecordingSubscriber::new();
    runtime
        .start_bus("test-bus")
        .open_topic("test-topic")
        .unwrap()
        .subscribe(subscriber.clone());

    assert!(subscriber.wait_for(3));
    assert_eq!(subscriber.ids(), ["0", "1", "2"]);
    assert_eq!(
        subscriber.payloads(),
        ["test1instance0", "test1instance1", "test1instance2"]
    );
    assert!(subscriber
        .messages()
        .iter()
        .all(|m| m.message_type == "test1type"));

    assert!(wait_until(DEFAULT_WAIT, || publisher.reader().read_sequence() == 3));
    runtime.shutdown();
}

#[test]
fn publishing_resumes_where_the_reader_stopped() {
    let runtime = runtime();
    let journal = runtime.open_journal("j");
    journal.write("s1", NO_STREAM_VERSION, &batch_of("t", 2)).unwrap();

    let subscriber = RecordingSubscriber::new();
    let first = runtime.publish("j", "b", "t").unwrap();
    first.topic().subscribe(subscriber.clone());
    assert!(subscriber.wait_for(2));
    first.close();

    journal.write("s1", 1, &batch_of("t", 2)).unwrap();
    let second = runtime.publish("j", "b", "t").unwrap();
    assert!(Arc::ptr_eq(first.reader(), second.reader()));
    assert!(subscriber.wait_for(4));
    assert_eq!(subscriber.ids(), ["0", "1", "2", "3"]);
    runtime.shutdown();
}

#[test]
fn topics_track_positions_independently() {
    let runtime = runtime();
    let journal = runtime.open_journal("j");
    let fast = runtime.publish("j", "b", "fast").unwrap();
    let slow = runtime.publish("j", "b", "slow").unwrap();

    let early = RecordingSubscriber::new();
    fast.topic().subscribe(early.clone());
    journal.write("s1", NO_STREAM_VERSION, &batch_of("t", 5)).unwrap();
    assert!(early.wait_for(5));

    let late = RecordingSubscriber::new();
    slow.topic().subscribe(late.clone());
    assert!(late.wait_for(5));
    assert_eq!(early.payloads(), late.payloads());
    runtime.shutdown();
}

#[test]
fn failing_subscriber_does_not_stop_the_publisher() {
    let runtime = runtime();
    let journal = runtime.open_journal("j");
    let publisher = runtime.publish("j", "b", "t").unwrap();
    let failing = eventide_testkit::FailingSubscriber::new();
    let recorder = RecordingSubscriber::new();
    publisher.topic().subscribe(failing.clone());
    publisher.topic().subscribe(recorder.clone());

    journal.write("s1", NO_STREAM_VERSION, &batch_of("t", 4)).unwrap();
    assert!(recorder.wait_for(4));
    assert!(wait_until(DEFAULT_WAIT, || failing.attempts() == 4));
    runtime.shutdown();
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProductDefined {
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProductRenamed {
    name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum ProductEvent {
    Defined(ProductDefined),
    Renamed(ProductRenamed),
}

impl From<ProductDefined> for ProductEvent {
    fn from(e: ProductDefined) -> Self {
        Self::Defined(e)
    }
}

impl From<ProductRenamed> for ProductEvent {
    fn from(e: ProductRenamed) -> Self {
        Self::Renamed(e)
    }
}

impl SourceEvent for ProductEvent {
    fn type_tag(&self) -> &'static str {
        match self {
            Self::Defined(_) => "ProductDefined",
            Self::Renamed(_) => "ProductRenamed",
        }
    }
}

#[derive(Debug, Default)]
struct Product {
    name: String,
    renames: usize,
}

impl EventSourced for Product {
    type Event = ProductEvent;

    fn apply(mut self, event: &ProductEvent) -> Self {
        match event {
            ProductEvent::Defined(e) => self.name = e.name.clone(),
            ProductEvent::Renamed(e) => {
                self.name = e.name.clone();
                self.renames += 1;
            }
        }
        self
    }
}

impl StreamCategory for Product {
    const CATEGORY: &'static str = "product";
}

#[test]
fn category_publisher_relays_only_its_entities() {
    let runtime = runtime();
    let journal = runtime.open_journal("catalog");
    let topic = category_stream_for::<Product>();
    let publisher = runtime
        .publish_with(
            "catalog",
            "catalog-bus",
            &topic,
            PublisherConfig::new()
                .poll_interval(Duration::from_millis(5))
                .scope(StreamQuery::category_of::<Product>()),
        )
        .unwrap();
    let subscriber = RecordingSubscriber::new();
    publisher.topic().subscribe(subscriber.clone());

    let types = TypeRegistry::new()
        .with::<ProductDefined>("ProductDefined")
        .with::<ProductRenamed>("ProductRenamed");
    let products = Repository::<Product>::new(Arc::clone(&journal), types);

    let mut ids = Vec::new();
    for n in 0..4 {
        let id = Uuid::new_v4().to_string();
        let mut product = Sourced::<Product>::new();
        product.apply(ProductEvent::Defined(ProductDefined {
            name: format!("product {n}"),
        }));
        product.apply(ProductEvent::Renamed(ProductRenamed {
            name: format!("renamed {n}"),
        }));
        products.save_for::<Product>(&id, &mut product).unwrap();
        journal
            .write(&format!("customer_{n}"), NO_STREAM_VERSION, &batch_of("Visited", 1))
            .unwrap();
        ids.push(id);
    }

    assert!(subscriber.wait_for(8));
    assert_eq!(topic, "cat-product");
    let ids_seen: Vec<_> = subscriber.ids();
    let expected: Vec<_> = (0..8).map(|i: i32| i.to_string()).collect();
    assert_eq!(ids_seen, expected);
    assert!(subscriber
        .messages()
        .iter()
        .all(|m| m.message_type.starts_with("Product")));

    let loaded = products.load_for::<Product>(&ids[2]).unwrap();
    assert_eq!(loaded.state().name, "renamed 2");
    assert_eq!(loaded.state().renames, 1);
    assert_eq!(loaded.current_version(), 1);

    let category = journal
        .stream_reader()
        .stream_for(&category_stream_for::<Product>());
    assert_eq!(category.stream.len(), 8);
    assert_eq!(category.stream_version, 7);
    runtime.shutdown();
}
