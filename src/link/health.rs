//! # Link Health
//!
//! Staleness evaluation and periodic link status reporting.
//!
//! Freshness is judged on local arrival time only; the sender's own
//! timestamp is never trusted for this.

use std::time::{Duration, Instant};

use super::receiver::{LinkCounters, LinkSnapshot};
use crate::wind::protocol::WindFrame;

/// Default age after which data is considered stale
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_millis(2000);

/// Pure freshness evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkHealth {
    stale_after: Duration,
}

impl Default for LinkHealth {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_AFTER)
    }
}

impl LinkHealth {
    #[must_use]
    pub fn new(stale_after: Duration) -> Self {
        Self { stale_after }
    }

    #[must_use]
    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Whether the link delivered a valid frame recently enough
    ///
    /// Always false before the first valid frame.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, Instant};
    /// use anemo_rx::link::health::LinkHealth;
    /// use anemo_rx::link::receiver::LinkSnapshot;
    ///
    /// let health = LinkHealth::new(Duration::from_millis(2000));
    /// assert!(!health.is_fresh(&LinkSnapshot::default(), Instant::now()));
    /// ```
    #[must_use]
    pub fn is_fresh(&self, snapshot: &LinkSnapshot, now: Instant) -> bool {
        self.age(snapshot, now)
            .map(|age| age <= self.stale_after)
            .unwrap_or(false)
    }

    /// Time since the latest valid frame arrived
    #[must_use]
    pub fn age(&self, snapshot: &LinkSnapshot, now: Instant) -> Option<Duration> {
        snapshot
            .latest
            .map(|r| now.saturating_duration_since(r.arrived_at))
    }

    /// The latest frame, only if it is still fresh
    #[must_use]
    pub fn fresh_frame(&self, snapshot: &LinkSnapshot, now: Instant) -> Option<WindFrame> {
        if self.is_fresh(snapshot, now) {
            snapshot.latest.map(|r| r.frame)
        } else {
            None
        }
    }
}

/// Online/offline change since the previous report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTransition {
    Online,
    Offline,
}

/// One periodic link status report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkReport {
    /// Datagrams received since the previous report
    pub datagrams: u64,
    pub fresh: bool,
    pub age: Option<Duration>,
    pub last_seq: Option<u32>,
    pub counters: LinkCounters,
    pub transition: Option<LinkTransition>,
}

/// Tracks datagram rate and freshness flips between periodic reports
#[derive(Debug, Default)]
pub struct LinkStatusTracker {
    last_received: u64,
    was_fresh: bool,
}

impl LinkStatusTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a report and remember this observation for the next one
    pub fn observe(&mut self, health: &LinkHealth, snapshot: &LinkSnapshot, now: Instant) -> LinkReport {
        let fresh = health.is_fresh(snapshot, now);
        let datagrams = snapshot.counters.received.saturating_sub(self.last_received);

        let transition = match (self.was_fresh, fresh) {
            (false, true) => Some(LinkTransition::Online),
            (true, false) => Some(LinkTransition::Offline),
            _ => None,
        };

        self.last_received = snapshot.counters.received;
        self.was_fresh = fresh;

        LinkReport {
            datagrams,
            fresh,
            age: if fresh { health.age(snapshot, now) } else { None },
            last_seq: snapshot.last_seq(),
            counters: snapshot.counters,
            transition,
        }
    }
}
