//! Demo command implementation.

use eventide_bus::BusResult;
use eventide_core::{
    Config, EventSourced, Message, Repository, Runtime, SourceEvent, Sourced, StreamCategory,
    StreamQuery, Subscriber, TypeRegistry,
};
use eventide_journal::{category_stream_for, EntryBatch, NO_STREAM_VERSION};
use eventide_testkit::wait_until;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

const JOURNAL: &str = "catalog";
const BUS: &str = "catalog-bus";

/// A product was added to the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDefined {
    /// Product id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Price in cents.
    pub price_cents: u64,
}

/// A product's price changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceChanged {
    /// New price in cents.
    pub price_cents: u64,
}

/// Events of the product entity.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProductEvent {
    /// See [`ProductDefined`].
    Defined(ProductDefined),
    /// See [`PriceChanged`].
    PriceChanged(PriceChanged),
}

impl From<ProductDefined> for ProductEvent {
    fn from(event: ProductDefined) -> Self {
        Self::Defined(event)
    }
}

impl From<PriceChanged> for ProductEvent {
    fn from(event: PriceChanged) -> Self {
        Self::PriceChanged(event)
    }
}

impl SourceEvent for ProductEvent {
    fn type_tag(&self) -> &'static str {
        match self {
            Self::Defined(_) => "ProductDefined",
            Self::PriceChanged(_) => "PriceChanged",
        }
    }
}

/// A catalog product.
#[derive(Debug, Default, Serialize)]
pub struct Product {
    /// Product id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current price in cents.
    pub price_cents: u64,
}

impl EventSourced for Product {
    type Event = ProductEvent;

    fn apply(mut self, event: &ProductEvent) -> Self {
        match event {
            ProductEvent::Defined(e) => {
                self.id = e.id.clone();
                self.name = e.name.clone();
                self.price_cents = e.price_cents;
            }
            ProductEvent::PriceChanged(e) => self.price_cents = e.price_cents,
        }
        self
    }
}

impl StreamCategory for Product {
    const CATEGORY: &'static str = "product";
}

fn product_types() -> TypeRegistry<ProductEvent> {
    TypeRegistry::new()
        .with::<ProductDefined>("ProductDefined")
        .with::<PriceChanged>("PriceChanged")
}

/// Prints every message it receives.
struct Printer {
    json: bool,
    received: AtomicUsize,
}

impl Printer {
    fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }
}

impl Subscriber for Printer {
    fn handle(&self, message: &Message) -> BusResult<()> {
        if self.json {
            match serde_json::to_string(message) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!(error = %err, "failed to encode message"),
            }
        } else {
            println!("  [{}] {} {}", message.id, message.message_type, message.payload);
        }
        self.received.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Runs the demo command.
pub fn run(products: usize, category_only: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::new(Config::new().poll_every(Duration::from_millis(10)));
    let scope = if category_only {
        StreamQuery::category_of::<Product>()
    } else {
        StreamQuery::All
    };
    let publisher = runtime.publish_with(
        JOURNAL,
        BUS,
        &category_stream_for::<Product>(),
        runtime.config().publisher.clone().scope(scope),
    )?;

    let printer = Arc::new(Printer {
        json: format == "json",
        received: AtomicUsize::new(0),
    });
    publisher.topic().subscribe(printer.clone());
    if !printer.json {
        println!("Messages on {}:", publisher.topic().name());
    }

    let journal = runtime.open_journal(JOURNAL);
    journal.write("audit_demo", NO_STREAM_VERSION, &EntryBatch::of("DemoStarted", "{}"))?;

    let repository = Repository::<Product>::new(Arc::clone(&journal), product_types());
    let mut ids = Vec::with_capacity(products);
    for n in 0..products {
        let id = Uuid::new_v4().to_string();
        let mut product = Sourced::<Product>::new();
        product.apply(ProductEvent::Defined(ProductDefined {
            id: id.clone(),
            name: format!("Product {}", n + 1),
            price_cents: 1_000 + 250 * n as u64,
        }));
        product.apply(ProductEvent::PriceChanged(PriceChanged {
            price_cents: 900 + 250 * n as u64,
        }));
        repository.save_for::<Product>(&id, &mut product)?;
        ids.push(id);
    }

    let expected = journal.len() - usize::from(category_only);
    if !wait_until(Duration::from_secs(5), || printer.received() >= expected) {
        warn!(expected, received = printer.received(), "not every entry was delivered");
    }

    if !printer.json {
        println!("\nProducts:");
        for id in &ids {
            let product = repository.load_for::<Product>(id)?;
            let state = product.state();
            println!(
                "  {} {:<12} {:>6} cents (version {})",
                state.id,
                state.name,
                state.price_cents,
                product.current_version()
            );
        }
    }

    runtime.shutdown();
    info!(
        products,
        delivered = printer.received(),
        "demo finished"
    );
    Ok(())
}
