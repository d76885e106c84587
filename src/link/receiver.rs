//! # Link Receiver
//!
//! Intake side of the wireless link. Every datagram goes through
//! [`LinkReceiver::on_receive`], which validates it, tracks sequence
//! continuity, and publishes a complete [`LinkSnapshot`].
//!
//! The receiver is the only writer. Readers hold a [`LinkMonitor`] and only
//! ever see whole snapshots: the latest frame and its arrival time travel
//! together in one [`Reception`], and a snapshot is swapped in with a single
//! `watch::Sender::send_replace`.

use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, trace};

use crate::wind::decoder::{decode_frame, FrameRejection};
use crate::wind::protocol::WindFrame;

/// Monotonic link counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCounters {
    /// Every datagram handed to the receiver, valid or not
    pub received: u64,
    /// Frames missing according to sequence numbers
    pub lost: u64,
    /// Datagrams of the wrong size
    pub bad_length: u64,
    /// Datagrams with wrong magic or version
    pub bad_magic: u64,
    /// Datagrams failing the checksum
    pub bad_crc: u64,
}

impl LinkCounters {
    /// Total malformed datagrams
    pub fn rejected(&self) -> u64 {
        self.bad_length + self.bad_magic + self.bad_crc
    }
}

/// A validated frame together with its local arrival time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reception {
    pub frame: WindFrame,
    pub arrived_at: Instant,
}

/// Self-consistent view of the link published after every datagram
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    /// Latest validated frame, `None` until the first one arrives
    pub latest: Option<Reception>,
    pub counters: LinkCounters,
}

impl LinkSnapshot {
    /// Whether a valid frame has ever been received
    pub fn has_data(&self) -> bool {
        self.latest.is_some()
    }

    /// Sequence number of the latest valid frame
    pub fn last_seq(&self) -> Option<u32> {
        self.latest.map(|r| r.frame.seq)
    }
}

/// Result of handling one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Frame accepted; `lost` is how many frames this one revealed as missing
    Accepted { seq: u32, lost: u32 },
    /// Datagram dropped
    Rejected(FrameRejection),
}

/// Single-writer link state machine
#[derive(Debug)]
pub struct LinkReceiver {
    last_seq: Option<u32>,
    snapshot: LinkSnapshot,
    publisher: watch::Sender<LinkSnapshot>,
}

impl LinkReceiver {
    /// Create a receiver and the monitor that observes it
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Instant;
    /// use anemo_rx::link::receiver::LinkReceiver;
    ///
    /// let (mut receiver, monitor) = LinkReceiver::new();
    /// receiver.on_receive(&[0u8; 3], Instant::now());
    /// assert_eq!(monitor.snapshot().counters.bad_length, 1);
    /// ```
    pub fn new() -> (Self, LinkMonitor) {
        let (publisher, rx) = watch::channel(LinkSnapshot::default());
        let receiver = Self {
            last_seq: None,
            snapshot: LinkSnapshot::default(),
            publisher,
        };
        (receiver, LinkMonitor { rx })
    }

    /// Handle one inbound datagram received at `now`
    ///
    /// Never blocks and never allocates. Rejections are counted and
    /// otherwise ignored; the sender will transmit again.
    pub fn on_receive(&mut self, data: &[u8], now: Instant) -> ReceiveOutcome {
        self.snapshot.counters.received += 1;

        let outcome = match decode_frame(data) {
            Ok(frame) => {
                let lost = self.account_sequence(frame.seq);
                self.snapshot.latest = Some(Reception {
                    frame,
                    arrived_at: now,
                });
                ReceiveOutcome::Accepted {
                    seq: frame.seq,
                    lost,
                }
            }
            Err(rejection) => {
                let counters = &mut self.snapshot.counters;
                match rejection {
                    FrameRejection::LengthMismatch { .. } => counters.bad_length += 1,
                    FrameRejection::BadMagic { .. } => counters.bad_magic += 1,
                    FrameRejection::BadChecksum { .. } => counters.bad_crc += 1,
                }
                trace!("Dropped datagram: {}", rejection);
                ReceiveOutcome::Rejected(rejection)
            }
        };

        self.publisher.send_replace(self.snapshot);
        outcome
    }

    /// Current counters as seen by the writer
    pub fn counters(&self) -> LinkCounters {
        self.snapshot.counters
    }

    /// Update loss accounting for an accepted sequence number
    ///
    /// A forward gap counts every skipped number. Anything at or behind the
    /// expected number (restart, wrap, reorder, duplicate) counts as one.
    fn account_sequence(&mut self, seq: u32) -> u32 {
        let lost = match self.last_seq {
            Some(last) => {
                let expected = last.wrapping_add(1);
                if seq > expected {
                    seq - expected
                } else if seq < expected {
                    1
                } else {
                    0
                }
            }
            None => 0,
        };

        if lost > 0 {
            debug!("Sequence gap: last {:?}, got {} ({} lost)", self.last_seq, seq, lost);
            self.snapshot.counters.lost += lost as u64;
        }

        self.last_seq = Some(seq);
        lost
    }
}

/// Read side of the link, cheap to clone
#[derive(Debug, Clone)]
pub struct LinkMonitor {
    rx: watch::Receiver<LinkSnapshot>,
}

impl LinkMonitor {
    /// Copy out the latest published snapshot
    pub fn snapshot(&self) -> LinkSnapshot {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wind::encoder::encode_reading;
    use crate::wind::protocol::STATUS_DIRECTION_VALID;
    use std::time::Duration;

    fn frame_bytes(seq: u32) -> [u8; 28] {
        encode_reading(seq, seq.wrapping_mul(100), 9000, 500, 1500, STATUS_DIRECTION_VALID)
    }

    #[test]
    fn test_initial_snapshot_is_empty() {
        let (_receiver, monitor) = LinkReceiver::new();
        let snapshot = monitor.snapshot();
        assert!(!snapshot.has_data());
        assert_eq!(snapshot.counters, LinkCounters::default());
    }

    #[test]
    fn test_valid_frame_is_published_with_arrival_time() {
        let (mut receiver, monitor) = LinkReceiver::new();
        let t0 = Instant::now();

        let outcome = receiver.on_receive(&frame_bytes(1), t0);
        assert_eq!(outcome, ReceiveOutcome::Accepted { seq: 1, lost: 0 });

        let snapshot = monitor.snapshot();
        let reception = snapshot.latest.expect("frame should be published");
        assert_eq!(reception.frame.seq, 1);
        assert_eq!(reception.arrived_at, t0);
        assert_eq!(snapshot.counters.received, 1);
    }

    #[test]
    fn test_rejections_increment_matching_counter() {
        let (mut receiver, monitor) = LinkReceiver::new();
        let now = Instant::now();

        receiver.on_receive(&[0u8; 27], now);

        let mut bad_magic = frame_bytes(1);
        bad_magic[0] = 0;
        receiver.on_receive(&bad_magic, now);
        receiver.on_receive(&bad_magic, now);

        let mut bad_crc = frame_bytes(1);
        bad_crc[10] ^= 0x40;
        receiver.on_receive(&bad_crc, now);
        receiver.on_receive(&bad_crc, now);
        receiver.on_receive(&bad_crc, now);

        let counters = monitor.snapshot().counters;
        assert_eq!(counters.bad_length, 1);
        assert_eq!(counters.bad_magic, 2);
        assert_eq!(counters.bad_crc, 3);
        assert_eq!(counters.rejected(), 6);
        assert_eq!(counters.received, 6);
        assert_eq!(counters.lost, 0);
        assert!(!monitor.snapshot().has_data());
    }

    #[test]
    fn test_rejected_frame_keeps_previous_reception() {
        let (mut receiver, monitor) = LinkReceiver::new();
        let t0 = Instant::now();
        receiver.on_receive(&frame_bytes(5), t0);

        let mut bad = frame_bytes(6);
        bad[27] ^= 0xFF;
        receiver.on_receive(&bad, t0 + Duration::from_millis(100));

        let reception = monitor.snapshot().latest.unwrap();
        assert_eq!(reception.frame.seq, 5);
        assert_eq!(reception.arrived_at, t0);
    }

    #[test]
    fn test_forward_gap_counts_every_missing_frame() {
        let (mut receiver, monitor) = LinkReceiver::new();
        let now = Instant::now();

        receiver.on_receive(&frame_bytes(10), now);
        let outcome = receiver.on_receive(&frame_bytes(13), now);

        // 11 and 12 never arrived
        assert_eq!(outcome, ReceiveOutcome::Accepted { seq: 13, lost: 2 });
        assert_eq!(monitor.snapshot().counters.lost, 2);
    }

    #[test]
    fn test_repeated_sequence_counts_one() {
        let (mut receiver, monitor) = LinkReceiver::new();
        let now = Instant::now();

        receiver.on_receive(&frame_bytes(10), now);
        receiver.on_receive(&frame_bytes(10), now);

        assert_eq!(monitor.snapshot().counters.lost, 1);
    }

    #[test]
    fn test_sender_restart_counts_one() {
        let (mut receiver, monitor) = LinkReceiver::new();
        let now = Instant::now();

        receiver.on_receive(&frame_bytes(5000), now);
        receiver.on_receive(&frame_bytes(0), now);
        receiver.on_receive(&frame_bytes(1), now);

        assert_eq!(monitor.snapshot().counters.lost, 1);
        assert_eq!(monitor.snapshot().last_seq(), Some(1));
    }

    #[test]
    fn test_contiguous_sequence_counts_nothing() {
        let (mut receiver, monitor) = LinkReceiver::new();
        let now = Instant::now();

        for seq in 100..200 {
            receiver.on_receive(&frame_bytes(seq), now);
        }

        assert_eq!(monitor.snapshot().counters.lost, 0);
    }

    #[test]
    fn test_sequence_wraps_without_loss() {
        let (mut receiver, monitor) = LinkReceiver::new();
        let now = Instant::now();

        receiver.on_receive(&frame_bytes(u32::MAX), now);
        receiver.on_receive(&frame_bytes(0), now);

        assert_eq!(monitor.snapshot().counters.lost, 0);
    }

    #[test]
    fn test_first_frame_never_counts_loss() {
        let (mut receiver, monitor) = LinkReceiver::new();
        receiver.on_receive(&frame_bytes(1_000_000), Instant::now());
        assert_eq!(monitor.snapshot().counters.lost, 0);
    }

    #[test]
    fn test_rejected_frames_do_not_touch_sequence() {
        let (mut receiver, monitor) = LinkReceiver::new();
        let now = Instant::now();

        receiver.on_receive(&frame_bytes(1), now);
        let mut bad = frame_bytes(50);
        bad[27] ^= 0x01;
        receiver.on_receive(&bad, now);
        receiver.on_receive(&frame_bytes(2), now);

        assert_eq!(monitor.snapshot().counters.lost, 0);
    }

    #[test]
    fn test_monitor_clones_observe_same_state() {
        let (mut receiver, monitor) = LinkReceiver::new();
        let other = monitor.clone();

        receiver.on_receive(&frame_bytes(3), Instant::now());

        assert_eq!(monitor.snapshot(), other.snapshot());
        assert_eq!(receiver.counters(), monitor.snapshot().counters);
    }

    #[test]
    fn test_reader_on_other_thread_sees_consistent_pairs() {
        let (mut receiver, monitor) = LinkReceiver::new();
        let t0 = Instant::now();

        let reader = std::thread::spawn(move || {
            for _ in 0..10_000 {
                if let Some(r) = monitor.snapshot().latest {
                    // Writer stamps frame seq n at t0 + n ms
                    let offset = r.arrived_at.duration_since(t0);
                    assert_eq!(offset, Duration::from_millis(r.frame.seq as u64));
                }
            }
        });

        for seq in 0..2_000u32 {
            receiver.on_receive(&frame_bytes(seq), t0 + Duration::from_millis(seq as u64));
        }

        reader.join().expect("reader observed a torn snapshot");
    }
}
