//! # Reference tracker - live consumer counts and pending evictions.
//!
//! Pure state machine behind the grace-period eviction protocol. It owns two
//! maps and never touches the registry or the runtime itself; the cache
//! applies its decisions (spawning timers, deleting entries).
//!
//! ## State
//! ```text
//! counts:  HashMap<ControllerKey, usize>            (absent = no known consumers, never 0)
//! pending: HashMap<ControllerKey, PendingEviction>  (at most one per key)
//! ```
//!
//! ## Protocol
//! ```text
//! attach(k):  pending[k]? → cancel + remove      counts[k] += 1
//! detach(k):  counts[k] -= 1
//!             ├─ > 0  → Remaining(n)
//!             ├─ == 0 → remove counts[k], pending[k] = new timer (replacing any old one)
//!             │         (parent token cancelled → Released, no timer)
//!             └─ absent → Untracked (no-op)
//! fire(k, g): pending[k].generation == g ?
//!             ├─ no            → Stale (canceled or superseded)
//!             ├─ counts[k] set → Live (timer removed, nothing evicted)
//!             └─ otherwise     → Evict (timer removed)
//! ```
//!
//! ## Rules
//! - Every scheduled timer gets a fresh generation; `fire` re-checks it and
//!   liveness, so a stale timer can never remove a newer instance.
//! - Cancelling a token is advisory; the `fire` re-check is authoritative.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::controllers::ControllerKey;

/// One scheduled eviction.
#[derive(Debug)]
struct PendingEviction {
    generation: u64,
    cancel: CancellationToken,
}

/// Outcome of [`RefTracker::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attached {
    /// Live count after attaching.
    pub count: usize,
    /// True if a pending eviction was canceled.
    pub canceled: bool,
}

/// Outcome of [`RefTracker::detach`].
#[derive(Debug)]
pub(crate) enum Detached {
    /// Other consumers remain.
    Remaining(usize),
    /// Last consumer left; the caller must arm a timer for `generation`
    /// that stops early when `cancel` fires.
    Scheduled {
        generation: u64,
        cancel: CancellationToken,
        /// True if an older timer for the key had to be replaced.
        replaced: bool,
    },
    /// Last consumer left after shutdown; no timer is armed and the entry stays.
    Released,
    /// No consumers were recorded for the key.
    Untracked,
}

/// Outcome of [`RefTracker::fire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fired {
    /// Still unreferenced: evict now.
    Evict,
    /// Timer was canceled or superseded.
    Stale,
    /// Timer was current but the key has live consumers.
    Live,
}

/// Live counts plus pending evictions.
#[derive(Debug, Default)]
pub(crate) struct RefTracker {
    counts: HashMap<ControllerKey, usize>,
    pending: HashMap<ControllerKey, PendingEviction>,
    next_generation: u64,
}

impl RefTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any pending eviction for `key` and counts one more consumer.
    pub fn attach(&mut self, key: &ControllerKey) -> Attached {
        let canceled = match self.pending.remove(key) {
            Some(p) => {
                p.cancel.cancel();
                true
            }
            None => false,
        };
        let count = self.counts.entry(key.clone()).or_insert(0);
        *count += 1;
        Attached {
            count: *count,
            canceled,
        }
    }

    /// Counts one consumer less; schedules eviction when none remain.
    ///
    /// The new timer's token is a child of `parent`, so cancelling `parent`
    /// cancels every pending eviction. Once `parent` is cancelled no new
    /// eviction is scheduled.
    pub fn detach(&mut self, key: &ControllerKey, parent: &CancellationToken) -> Detached {
        let Some(count) = self.counts.get_mut(key) else {
            return Detached::Untracked;
        };
        *count = count.saturating_sub(1);
        if *count > 0 {
            return Detached::Remaining(*count);
        }
        self.counts.remove(key);
        if parent.is_cancelled() {
            return Detached::Released;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = parent.child_token();
        let replaced = match self.pending.insert(
            key.clone(),
            PendingEviction {
                generation,
                cancel: cancel.clone(),
            },
        ) {
            Some(old) => {
                old.cancel.cancel();
                true
            }
            None => false,
        };
        Detached::Scheduled {
            generation,
            cancel,
            replaced,
        }
    }

    /// Resolves a grace timer that ran to completion.
    pub fn fire(&mut self, key: &ControllerKey, generation: u64) -> Fired {
        match self.pending.get(key) {
            Some(p) if p.generation == generation => {
                self.pending.remove(key);
                if self.counts.contains_key(key) {
                    Fired::Live
                } else {
                    Fired::Evict
                }
            }
            _ => Fired::Stale,
        }
    }

    /// Cancels every pending eviction. Counts are kept.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.pending.len();
        for (_, p) in self.pending.drain() {
            p.cancel.cancel();
        }
        n
    }

    /// Live count for `key` (0 if untracked).
    pub fn count(&self, key: &ControllerKey) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// True if `key` has any recorded consumer.
    pub fn is_tracked(&self, key: &ControllerKey) -> bool {
        self.counts.contains_key(key)
    }

    /// True if an eviction is scheduled for `key`.
    pub fn is_pending(&self, key: &ControllerKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Number of scheduled evictions.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tag: &str) -> ControllerKey {
        ControllerKey::new("Counter", Some(tag))
    }

    fn scheduled(d: Detached) -> (u64, CancellationToken) {
        match d {
            Detached::Scheduled {
                generation, cancel, ..
            } => (generation, cancel),
            other => panic!("expected Scheduled, got {other:?}"),
        }
    }

    #[test]
    fn counts_up_and_down() {
        let root = CancellationToken::new();
        let mut t = RefTracker::new();
        let k = key("a");

        assert_eq!(t.attach(&k).count, 1);
        assert_eq!(t.attach(&k).count, 2);
        assert!(matches!(t.detach(&k, &root), Detached::Remaining(1)));
        let (_, _) = scheduled(t.detach(&k, &root));

        assert!(!t.is_tracked(&k));
        assert_eq!(t.count(&k), 0);
        assert!(t.is_pending(&k));
    }

    #[test]
    fn repeated_attach_detach_keeps_one_timer() {
        let root = CancellationToken::new();
        let mut t = RefTracker::new();
        let k = key("a");
        let mut tokens = Vec::new();

        for _ in 0..5 {
            t.attach(&k);
            tokens.push(scheduled(t.detach(&k, &root)).1);
        }

        assert!(!t.is_tracked(&k));
        assert_eq!(t.pending_len(), 1);
        let (last, earlier) = tokens.split_last().unwrap();
        assert!(earlier.iter().all(CancellationToken::is_cancelled));
        assert!(!last.is_cancelled());
    }

    #[test]
    fn attach_cancels_pending_eviction() {
        let root = CancellationToken::new();
        let mut t = RefTracker::new();
        let k = key("a");

        t.attach(&k);
        let (generation, cancel) = scheduled(t.detach(&k, &root));
        let attached = t.attach(&k);

        assert!(attached.canceled);
        assert!(cancel.is_cancelled());
        assert_eq!(t.fire(&k, generation), Fired::Stale);
    }

    #[test]
    fn current_timer_evicts_once() {
        let root = CancellationToken::new();
        let mut t = RefTracker::new();
        let k = key("a");

        t.attach(&k);
        let (generation, _) = scheduled(t.detach(&k, &root));
        assert_eq!(t.fire(&k, generation), Fired::Evict);
        assert_eq!(t.fire(&k, generation), Fired::Stale);
        assert!(!t.is_pending(&k));
    }

    #[test]
    fn stale_generation_does_not_touch_newer_timer() {
        let root = CancellationToken::new();
        let mut t = RefTracker::new();
        let k = key("a");

        t.attach(&k);
        let (old, _) = scheduled(t.detach(&k, &root));
        t.attach(&k);
        let (new, _) = scheduled(t.detach(&k, &root));

        assert_eq!(t.fire(&k, old), Fired::Stale);
        assert!(t.is_pending(&k));
        assert_eq!(t.fire(&k, new), Fired::Evict);
    }

    #[test]
    fn timer_for_a_referenced_key_is_live() {
        let root = CancellationToken::new();
        let mut t = RefTracker::new();
        let k = key("a");

        t.attach(&k);
        let (generation, _) = scheduled(t.detach(&k, &root));
        // A consumer counted without going through `attach` (broken pairing).
        t.counts.insert(k.clone(), 1);

        assert_eq!(t.fire(&k, generation), Fired::Live);
        assert!(!t.is_pending(&k));
        assert_eq!(t.count(&k), 1);
    }

    #[test]
    fn detach_after_parent_cancelled_arms_nothing() {
        let root = CancellationToken::new();
        let mut t = RefTracker::new();
        let k = key("a");

        t.attach(&k);
        t.attach(&k);
        root.cancel();
        assert!(matches!(t.detach(&k, &root), Detached::Remaining(1)));
        assert!(matches!(t.detach(&k, &root), Detached::Released));
        assert!(!t.is_tracked(&k));
        assert_eq!(t.pending_len(), 0);
    }

    #[test]
    fn detach_of_untracked_key_is_a_no_op() {
        let root = CancellationToken::new();
        let mut t = RefTracker::new();
        assert!(matches!(t.detach(&key("ghost"), &root), Detached::Untracked));
        assert_eq!(t.pending_len(), 0);
    }

    #[test]
    fn cancel_all_cancels_children_of_parent() {
        let root = CancellationToken::new();
        let mut t = RefTracker::new();
        for tag in ["a", "b"] {
            t.attach(&key(tag));
            t.detach(&key(tag), &root);
        }
        assert_eq!(t.cancel_all(), 2);
        assert_eq!(t.pending_len(), 0);
    }
}
