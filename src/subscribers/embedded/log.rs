//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [created] key="Counter-a"
//! [attached] key="Counter-a" count=1
//! [detached] key="Counter-a" count=0
//! [eviction-scheduled] key="Counter-a" delay_ms=5000
//! [evicted] key="Counter-a"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let key = e.key.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::ControllerCreated => println!("[created] key={key:?}"),
            EventKind::ControllerReused => println!("[reused] key={key:?}"),
            EventKind::ControllerRemoved => println!("[removed] key={key:?}"),
            EventKind::ConstructionFailed => {
                println!(
                    "[construction-failed] key={key:?} err={}",
                    e.reason.as_deref().unwrap_or("unknown")
                );
            }
            EventKind::Attached => println!("[attached] key={key:?} count={}", e.count.unwrap_or(0)),
            EventKind::Detached => println!("[detached] key={key:?} count={}", e.count.unwrap_or(0)),
            EventKind::EvictionScheduled => {
                println!(
                    "[eviction-scheduled] key={key:?} delay_ms={}",
                    e.delay_ms.unwrap_or(0)
                );
            }
            EventKind::EvictionCanceled => println!("[eviction-canceled] key={key:?}"),
            EventKind::Evicted => println!("[evicted] key={key:?}"),
            EventKind::EvictionSkipped => {
                println!("[eviction-skipped] key={key:?} reason={:?}", e.reason);
            }
            EventKind::InvariantViolation => {
                println!("[invariant-violation] key={key:?} reason={:?}", e.reason);
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={key} reason={:?}", e.reason);
            }
            EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber-panicked] subscriber={key} info={}",
                    e.reason.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
