//! # Link Module
//!
//! Wireless link intake and health.
//!
//! This module handles:
//! - Receiving datagrams from the sensor link
//! - Validating frames and counting rejections by reason
//! - Sequence gap (loss) accounting
//! - Publishing consistent snapshots to the periodic loop
//! - Freshness evaluation and periodic link reports

pub mod receiver;
pub mod health;
pub mod transport;
