//! # Example: Shared Counter
//!
//! Two "screens" share one `Counter` controller, a third one uses its own.
//! The shared counter survives a quick remount inside the grace period and
//! is evicted once nobody has held it for longer than that.
//!
//! Run with: `cargo run --example counter --features logging`

use std::{convert::Infallible, sync::Arc, time::Duration};

use ctrlcache::{CacheConfig, Controller, ControllerCache, Emitter, Handler, LogWriter, Subscribe};

struct Counter {
    value: Emitter<u64>,
}

impl Counter {
    fn new(start: u64) -> Result<Self, Infallible> {
        let value = Emitter::new();
        value.emit(start);
        Ok(Self { value })
    }

    fn increment(&self) {
        let next = self.value.current_value().unwrap_or(0) + 1;
        self.value.emit(next);
    }
}

impl Controller for Counter {
    const KIND: &'static str = "Counter";

    fn on_evict(&self) {
        println!("[counter] evicted at value={:?}", self.value.current_value());
    }
}

fn printer(screen: &'static str) -> Handler<u64> {
    Arc::new(move |v: &u64| println!("[{screen}] value={v}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let grace = Duration::from_millis(300);
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let cache = ControllerCache::builder(CacheConfig::default().with_grace(grace))
        .with_subscribers(subs)
        .build()?;

    // Two screens mount with tag "a"; the second factory is never called.
    let mut first = cache.acquire(Some("a"), || Counter::new(0))?;
    first.watch(|c| &c.value, printer("screen-1"));
    let mut second = cache.acquire(Some("a"), || Counter::new(100))?;
    second.watch(|c| &c.value, printer("screen-2"));

    // A third screen with tag "b" gets its own instance.
    let other = cache.acquire(Some("b"), || Counter::new(0))?;

    first.increment();
    second.increment();
    other.increment();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Both "a" screens unmount; one remounts before the grace period ends.
    drop(first);
    drop(second);
    tokio::time::sleep(grace / 3).await;
    let remounted = cache.acquire(Some("a"), || Counter::new(0))?;
    println!("[main] remounted value={:?}", remounted.value.current_value());

    // Everyone leaves; both counters are evicted after the grace period.
    drop(remounted);
    drop(other);
    tokio::time::sleep(grace + Duration::from_millis(100)).await;
    println!("[main] stored keys after grace: {:?}", cache.keys());

    cache.shutdown();
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("[main] finished");
    Ok(())
}
