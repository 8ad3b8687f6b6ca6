//! Connection State
//!
//! Tracks whether a remote observer is attached and turns level changes into
//! edges for the pipeline.
//!
//! The radio side reports connects and disconnects through
//! [`ConnectionObserver`] at any time, including in the middle of a tick. Each
//! report is a single atomic store, so a reader never sees a torn value. The
//! pipeline calls [`ConnectionState::poll_edge`] once per tick, which compares
//! the current level with the one it saw last time and remembers the new one.
//! A callback that lands just after the poll is picked up on the next tick.
//!
//! # State Machine
//! ```text
//! Disconnected --on_connect--> Connected
//! Connected --on_disconnect--> Disconnected
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

/// Capability handed to the transport for reporting link changes
pub trait ConnectionObserver {
    fn on_connect(&self);
    fn on_disconnect(&self);
}

/// Connection level change seen by a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Same level as the previous poll
    None,
    /// An observer attached since the previous poll
    JustConnected,
    /// The observer went away since the previous poll
    JustDisconnected,
}

/// Connection flags shared between the radio callbacks and the pipeline
///
/// Starts disconnected. Can live in a `static`.
#[derive(Debug)]
pub struct ConnectionState {
    /// Written by the radio callbacks
    current: AtomicBool,
    /// Level last observed by `poll_edge`, written only by the pipeline
    previous: AtomicBool,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionState {
    pub const fn new() -> Self {
        Self {
            current: AtomicBool::new(false),
            previous: AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.current.load(Ordering::Acquire)
    }

    /// Reports the edge since the last poll and records the current level.
    ///
    /// Meant to be called from the single pipeline task only.
    pub fn poll_edge(&self) -> Edge {
        let current = self.current.load(Ordering::Acquire);
        let previous = self.previous.swap(current, Ordering::Relaxed);
        match (previous, current) {
            (false, true) => Edge::JustConnected,
            (true, false) => Edge::JustDisconnected,
            _ => Edge::None,
        }
    }
}

impl ConnectionObserver for ConnectionState {
    fn on_connect(&self) {
        self.current.store(true, Ordering::Release);
    }

    fn on_disconnect(&self) {
        self.current.store(false, Ordering::Release);
    }
}
