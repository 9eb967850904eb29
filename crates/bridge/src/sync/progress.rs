//! Progress reporting for pipeline runs
//!
//! Orchestrators publish typed [`ProgressEvent`]s to a [`ProgressBus`];
//! consumers (status layer, log sink) subscribe independently. The bus
//! carries raw processed/total counts; any display clamping or percentage
//! math belongs to the consumer.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use serde::Serialize;

/// How long a duplicate log line stays suppressed
const DEDUP_WINDOW: Duration = Duration::from_secs(10);
/// Upper bound on tracked (message, phase) keys
const DEDUP_CAPACITY: usize = 256;

/// Pipeline phase tags carried by progress events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Fetch,
    Validation,
    /// Announces the post-consolidation group count before creation starts
    CreationStart,
    Creation,
    Filtering,
    Updating,
    Complete,
    Error,
}

/// One progress message emitted during a run
///
/// Events marked `log_only` carry a human-readable line and must not move
/// a progress bar.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub account: Option<String>,
    pub processed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub message: Option<String>,
    pub log_only: bool,
}

impl ProgressEvent {
    pub fn new(phase: ProgressPhase) -> Self {
        Self {
            phase,
            account: None,
            processed: 0,
            total: 0,
            succeeded: 0,
            failed: 0,
            message: None,
            log_only: false,
        }
    }

    /// A log-only event that must not move a progress bar
    pub fn log(phase: ProgressPhase, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            log_only: true,
            ..Self::new(phase)
        }
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn counts(mut self, processed: usize, total: usize) -> Self {
        self.processed = processed;
        self.total = total;
        self
    }

    pub fn outcomes(mut self, succeeded: usize, failed: usize) -> Self {
        self.succeeded = succeeded;
        self.failed = failed;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Multi-subscriber fan-out for progress events
///
/// Disconnected subscribers are dropped on the next publish. Duplicate
/// log-only events are suppressed by a sliding-window cache; counter
/// events always pass through.
pub struct ProgressBus {
    subscribers: Mutex<Vec<mpsc::Sender<ProgressEvent>>>,
    dedup: Mutex<RecentMessageCache>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            dedup: Mutex::new(RecentMessageCache::new(DEDUP_WINDOW, DEDUP_CAPACITY)),
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Publish an event to all live subscribers
    pub fn publish(&self, event: ProgressEvent) {
        if event.log_only {
            if let Some(message) = &event.message {
                let fresh = self
                    .dedup
                    .lock()
                    .unwrap()
                    .insert(message.clone(), event.phase);
                if !fresh {
                    return;
                }
            }
        }

        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Sliding-window duplicate suppression keyed by (message, phase)
///
/// Bounded two ways: entries expire after the window, and the map never
/// holds more than `capacity` keys (oldest evicted first).
pub struct RecentMessageCache {
    window: Duration,
    capacity: usize,
    entries: HashMap<(String, ProgressPhase), Instant>,
}

impl RecentMessageCache {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity,
            entries: HashMap::new(),
        }
    }

    /// Record a message; returns true if it is fresh (caller should emit)
    /// and false if an identical message was seen inside the window
    pub fn insert(&mut self, message: String, phase: ProgressPhase) -> bool {
        self.insert_at(message, phase, Instant::now())
    }

    fn insert_at(&mut self, message: String, phase: ProgressPhase, now: Instant) -> bool {
        let window = self.window;
        self.entries
            .retain(|_, seen| now.saturating_duration_since(*seen) < window);

        let key = (message, phase);
        if self.entries.contains_key(&key) {
            return false;
        }

        if self.entries.len() >= self.capacity {
            // Evict the oldest entry
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| *entry.1)
                .map(|entry| entry.0.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(key, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_suppresses_inside_window() {
        let mut cache = RecentMessageCache::new(Duration::from_secs(10), 16);
        let now = Instant::now();

        assert!(cache.insert_at("fetching".to_string(), ProgressPhase::Fetch, now));
        assert!(!cache.insert_at(
            "fetching".to_string(),
            ProgressPhase::Fetch,
            now + Duration::from_secs(5)
        ));
    }

    #[test]
    fn test_dedup_reemits_after_window() {
        let mut cache = RecentMessageCache::new(Duration::from_secs(10), 16);
        let now = Instant::now();

        assert!(cache.insert_at("fetching".to_string(), ProgressPhase::Fetch, now));
        assert!(cache.insert_at(
            "fetching".to_string(),
            ProgressPhase::Fetch,
            now + Duration::from_secs(10)
        ));
    }

    #[test]
    fn test_dedup_distinguishes_phase() {
        let mut cache = RecentMessageCache::new(Duration::from_secs(10), 16);
        let now = Instant::now();

        assert!(cache.insert_at("working".to_string(), ProgressPhase::Fetch, now));
        assert!(cache.insert_at("working".to_string(), ProgressPhase::Updating, now));
    }

    #[test]
    fn test_dedup_capacity_bound() {
        let mut cache = RecentMessageCache::new(Duration::from_secs(3600), 2);
        let now = Instant::now();

        assert!(cache.insert_at("a".to_string(), ProgressPhase::Fetch, now));
        assert!(cache.insert_at(
            "b".to_string(),
            ProgressPhase::Fetch,
            now + Duration::from_secs(1)
        ));
        // Third entry evicts "a", the oldest
        assert!(cache.insert_at(
            "c".to_string(),
            ProgressPhase::Fetch,
            now + Duration::from_secs(2)
        ));
        assert!(cache.insert_at(
            "a".to_string(),
            ProgressPhase::Fetch,
            now + Duration::from_secs(3)
        ));
    }

    #[test]
    fn test_bus_delivers_to_all_subscribers() {
        let bus = ProgressBus::new();
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();

        bus.publish(ProgressEvent::new(ProgressPhase::Fetch).counts(1, 10));

        assert_eq!(rx1.try_recv().unwrap().processed, 1);
        assert_eq!(rx2.try_recv().unwrap().processed, 1);
    }

    #[test]
    fn test_bus_drops_disconnected_subscribers() {
        let bus = ProgressBus::new();
        let rx = bus.subscribe();
        drop(rx);

        // Publishing must not fail with a dead subscriber
        bus.publish(ProgressEvent::new(ProgressPhase::Complete));
        assert!(bus.subscribers.lock().unwrap().is_empty());
    }

    #[test]
    fn test_bus_suppresses_duplicate_log_events() {
        let bus = ProgressBus::new();
        let rx = bus.subscribe();

        bus.publish(ProgressEvent::log(ProgressPhase::Fetch, "fetching orders"));
        bus.publish(ProgressEvent::log(ProgressPhase::Fetch, "fetching orders"));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_bus_never_suppresses_counter_events() {
        let bus = ProgressBus::new();
        let rx = bus.subscribe();

        bus.publish(ProgressEvent::new(ProgressPhase::Creation).counts(1, 2));
        bus.publish(ProgressEvent::new(ProgressPhase::Creation).counts(1, 2));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
    }
}
