//! # UI Module
//!
//! Front-panel interaction for the receiver.
//!
//! This module handles:
//! - Reading and debouncing the four buttons
//! - Screen navigation, the hold-to-configure gesture and calibration editing
//! - Building the per-screen view model and handing it to a display backend

pub mod buttons;
pub mod input;
pub mod machine;
pub mod view;
