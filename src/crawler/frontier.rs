//! Crawl frontier shared by the worker pool
//!
//! The visited set, the queue of pending URLs, the in-flight count and the
//! result count live behind one mutex, so "not yet visited" and "queued"
//! change together. The lock is never held across an await; idle workers
//! park on a [`Notify`] instead.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: Url,
    /// Link distance from the seed
    pub depth: u32,
}

/// Outcome of asking the frontier for work
#[derive(Debug)]
pub(crate) enum Pop {
    /// An entry to process; the caller must call [`Frontier::complete`] afterwards
    Entry(FrontierEntry),
    /// Nothing queued but pages are still in flight and may discover more
    Wait,
    /// Queue drained with nothing in flight, or the result limit was reached
    Done,
}

#[derive(Debug, Default)]
struct FrontierState {
    visited: HashSet<String>,
    queue: VecDeque<FrontierEntry>,
    in_flight: usize,
    results: usize,
    limit_reached: bool,
}

#[derive(Debug)]
pub(crate) struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
    limit: Option<usize>,
}

impl Frontier {
    pub(crate) fn new(limit: Option<usize>) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            notify: Notify::new(),
            limit,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds `url` at `depth` unless it was already seen
    ///
    /// The visited check and the queue insertion happen under one lock.
    /// Returns false for duplicates and once the result limit is reached.
    pub(crate) fn push(&self, url: Url, depth: u32) -> bool {
        {
            let mut state = self.lock();
            if state.limit_reached || !state.visited.insert(url.as_str().to_string()) {
                return false;
            }
            state.queue.push_back(FrontierEntry { url, depth });
        }
        self.notify.notify_waiters();
        true
    }

    /// Records `url` as visited without queueing it
    pub(crate) fn mark_visited(&self, url: &Url) {
        self.lock().visited.insert(url.as_str().to_string());
    }

    /// Takes the next entry and counts it as in flight
    pub(crate) fn pop(&self) -> Pop {
        let mut state = self.lock();
        if state.limit_reached {
            return Pop::Done;
        }

        match state.queue.pop_front() {
            Some(entry) => {
                state.in_flight += 1;
                Pop::Entry(entry)
            }
            None if state.in_flight > 0 => Pop::Wait,
            None => Pop::Done,
        }
    }

    /// Marks one popped entry as finished
    pub(crate) fn complete(&self) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.notify.notify_waiters();
    }

    /// Future resolved by the next state change
    ///
    /// Create it before calling [`pop`](Self::pop) so a change between the
    /// two calls is not missed.
    pub(crate) fn changed(&self) -> Notified<'_> {
        self.notify.notified()
    }

    /// Claims a result slot before a document is delivered
    ///
    /// Returns false once the limit is reached. Claiming the last slot drops
    /// every queued entry and wakes idle workers so they can exit.
    pub(crate) fn claim_result(&self) -> bool {
        let reached = {
            let mut state = self.lock();
            if state.limit_reached {
                return false;
            }
            state.results += 1;
            if self.limit.map_or(false, |limit| state.results >= limit) {
                state.limit_reached = true;
                let abandoned = state.queue.len();
                state.queue.clear();
                tracing::debug!("Result limit reached, abandoning {} queued URLs", abandoned);
                true
            } else {
                false
            }
        };

        if reached {
            self.notify.notify_waiters();
        }
        true
    }

    pub(crate) fn limit_reached(&self) -> bool {
        self.lock().limit_reached
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().queue.len()
    }
}

/// Calls [`Frontier::complete`] when dropped, including on panic
pub(crate) struct InFlight<'a>(pub(crate) &'a Frontier);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_push_deduplicates() {
        let frontier = Frontier::new(None);
        assert!(frontier.push(url("https://example.com/a"), 0));
        assert!(!frontier.push(url("https://example.com/a"), 1));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_pop_order_and_completion() {
        let frontier = Frontier::new(None);
        frontier.push(url("https://example.com/a"), 0);
        frontier.push(url("https://example.com/b"), 1);

        let first = match frontier.pop() {
            Pop::Entry(e) => e,
            other => panic!("expected entry, got {:?}", other),
        };
        assert_eq!(first.url.as_str(), "https://example.com/a");
        assert_eq!(first.depth, 0);

        let Pop::Entry(_) = frontier.pop() else {
            panic!("expected second entry");
        };

        // Both entries in flight, queue empty
        assert!(matches!(frontier.pop(), Pop::Wait));
        frontier.complete();
        assert!(matches!(frontier.pop(), Pop::Wait));
        frontier.complete();
        assert!(matches!(frontier.pop(), Pop::Done));
    }

    #[test]
    fn test_mark_visited_blocks_push() {
        let frontier = Frontier::new(None);
        frontier.mark_visited(&url("https://example.com/final"));
        assert!(!frontier.push(url("https://example.com/final"), 1));
    }

    #[test]
    fn test_limit_abandons_queue() {
        let frontier = Frontier::new(Some(2));
        frontier.push(url("https://example.com/a"), 0);
        frontier.push(url("https://example.com/b"), 0);
        frontier.push(url("https://example.com/c"), 0);

        assert!(frontier.claim_result());
        assert!(!frontier.limit_reached());
        assert!(frontier.claim_result());
        assert!(frontier.limit_reached());
        assert!(!frontier.claim_result());

        assert_eq!(frontier.len(), 0);
        assert!(matches!(frontier.pop(), Pop::Done));
        assert!(!frontier.push(url("https://example.com/d"), 1));
    }

    #[test]
    fn test_in_flight_guard_completes_on_drop() {
        let frontier = Frontier::new(None);
        frontier.push(url("https://example.com/a"), 0);
        let Pop::Entry(_) = frontier.pop() else {
            panic!("expected entry");
        };
        {
            let _guard = InFlight(&frontier);
            assert!(matches!(frontier.pop(), Pop::Wait));
        }
        assert!(matches!(frontier.pop(), Pop::Done));
    }

    #[tokio::test]
    async fn test_changed_wakes_on_push() {
        let frontier = std::sync::Arc::new(Frontier::new(None));
        let waiter = {
            let frontier = frontier.clone();
            tokio::spawn(async move {
                let changed = frontier.changed();
                if frontier.len() == 0 {
                    changed.await;
                }
                frontier.len()
            })
        };

        tokio::task::yield_now().await;
        frontier.push(url("https://example.com/a"), 0);
        assert_eq!(waiter.await.unwrap(), 1);
    }
}
