//! Notification Policy
//!
//! Decides once per tick whether the smoothed distance is pushed to the
//! observer.
//!
//! # Rules
//! - Nothing is sent while disconnected
//! - At least `interval` between two sends, the first send goes out right away
//! - With a threshold configured, only distances below it are sent
//!
//! The time of the last send is only updated when the transport accepted the
//! payload. A send that races a disconnect is dropped for this tick, the next
//! tick starts over from the current state.
//!
//! # Payload
//! Two fixed text formats, both with two decimals:
//! - `Distance: 20.00 cm`
//! - `Raw Distance Reading: 21.30cm, Processed Data: 20.00cm`

use core::fmt::Write;

use embassy_time::{Duration, Instant};
use heapless::String;

use crate::system::config::{NOTIFY_INTERVAL, NOTIFY_THRESHOLD_CM};
use crate::system::transport::{Transport, TransportError, DISTANCE_CHARACTERISTIC};

/// Longest payload either format produces for any sensible distance
pub const PAYLOAD_CAPACITY: usize = 64;

/// Rendered notification text
pub type Payload = String<PAYLOAD_CAPACITY>;

/// One filtered measurement
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Distance as measured this tick (cm)
    pub raw_cm: f32,
    /// Moving average including this tick (cm)
    pub smoothed_cm: f32,
}

/// Wire format of the notification payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadFormat {
    /// `Distance: <smoothed> cm`
    #[default]
    Distance,
    /// `Raw Distance Reading: <raw>cm, Processed Data: <smoothed>cm`
    RawAndProcessed,
}

impl PayloadFormat {
    /// Renders the reading, fails only if the text does not fit the payload
    pub fn render(&self, reading: &Reading) -> Result<Payload, core::fmt::Error> {
        let mut payload = Payload::new();
        match self {
            PayloadFormat::Distance => write!(payload, "Distance: {:.2} cm", reading.smoothed_cm)?,
            PayloadFormat::RawAndProcessed => write!(
                payload,
                "Raw Distance Reading: {:.2}cm, Processed Data: {:.2}cm",
                reading.raw_cm, reading.smoothed_cm
            )?,
        }
        Ok(payload)
    }
}

/// Policy settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PolicyConfig {
    interval: Duration,
    /// `None` disables threshold gating
    threshold_cm: Option<f32>,
    payload: PayloadFormat,
}

impl Default for PolicyConfig {
    /// 1s interval, 30cm threshold, `Distance` payload
    fn default() -> Self {
        Self {
            interval: NOTIFY_INTERVAL,
            threshold_cm: Some(NOTIFY_THRESHOLD_CM),
            payload: PayloadFormat::Distance,
        }
    }
}

impl PolicyConfig {
    pub fn set_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Only send distances strictly below `threshold_cm`
    pub fn set_threshold(mut self, threshold_cm: f32) -> Self {
        self.threshold_cm = Some(threshold_cm);
        self
    }

    /// Send on every interval regardless of distance
    pub fn disable_threshold(mut self) -> Self {
        self.threshold_cm = None;
        self
    }

    pub fn set_payload_format(mut self, payload: PayloadFormat) -> Self {
        self.payload = payload;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn threshold_cm(&self) -> Option<f32> {
        self.threshold_cm
    }

    pub fn payload_format(&self) -> PayloadFormat {
        self.payload
    }
}

/// Why a tick did not send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hold {
    Disconnected,
    /// Last send is less than one interval ago
    Interval,
    /// Smoothed distance is at or above the threshold
    Threshold,
}

/// Outcome of one notification attempt
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delivery {
    /// Payload handed to the transport
    Sent(Payload),
    /// Policy decided not to send
    Held(Hold),
    /// Observer vanished between the decision and the send, skipped
    SendRace,
    /// Transport or encoding failure, skipped
    Failed(TransportError),
}

/// Rate limiting and threshold gating of notifications
#[derive(Debug, Clone)]
pub struct NotificationPolicy {
    config: PolicyConfig,
    last_sent_at: Option<Instant>,
}

impl NotificationPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            last_sent_at: None,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Time of the last accepted send, `None` before the first one
    pub fn last_sent_at(&self) -> Option<Instant> {
        self.last_sent_at
    }

    /// First rule that holds the send back, if any
    pub fn hold_reason(&self, now: Instant, smoothed_cm: f32, connected: bool) -> Option<Hold> {
        if !connected {
            return Some(Hold::Disconnected);
        }
        if let Some(last) = self.last_sent_at {
            // a clock that went backwards counts as "not yet"
            match now.checked_duration_since(last) {
                Some(elapsed) if elapsed >= self.config.interval => {}
                _ => return Some(Hold::Interval),
            }
        }
        match self.config.threshold_cm {
            Some(threshold) if smoothed_cm >= threshold => Some(Hold::Threshold),
            _ => None,
        }
    }

    pub fn should_notify(&self, now: Instant, smoothed_cm: f32, connected: bool) -> bool {
        self.hold_reason(now, smoothed_cm, connected).is_none()
    }

    /// Applies the policy and sends through `transport` when it allows
    pub async fn notify<T: Transport>(
        &mut self,
        now: Instant,
        reading: &Reading,
        connected: bool,
        transport: &mut T,
    ) -> Delivery {
        if let Some(hold) = self.hold_reason(now, reading.smoothed_cm, connected) {
            return Delivery::Held(hold);
        }
        let Ok(payload) = self.config.payload.render(reading) else {
            return Delivery::Failed(TransportError::Encoding);
        };
        match transport.notify(DISTANCE_CHARACTERISTIC, payload.as_bytes()).await {
            Ok(()) => {
                self.last_sent_at = Some(now);
                Delivery::Sent(payload)
            }
            Err(TransportError::NotConnected) => Delivery::SendRace,
            Err(error) => Delivery::Failed(error),
        }
    }
}
