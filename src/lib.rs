//! Sonar beacon core
//!
//! Hardware independent part of the firmware: ultrasonic ranging, smoothing,
//! connection tracking and the notification policy, tied together by the
//! pipeline tick. Everything here builds for the host so it can be unit tested
//! with `cargo test`; the embassy tasks that drive it on the RP2350 live in the
//! firmware binary (`main.rs`).

#![cfg_attr(not(test), no_std)]

/// Core components of the measurement and delivery pipeline
pub mod system;

#[cfg(test)]
mod testing;
