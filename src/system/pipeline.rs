//! Measurement pipeline
//!
//! One tick of the firmware loop:
//! 1. Measure. An out-of-range sample skips straight to step 4, the filter
//!    window is left untouched.
//! 2. Smooth the distance and refresh the value served for direct reads.
//! 3. Let the notification policy decide whether to push the reading.
//! 4. Poll the connection edge. After a disconnect, wait for the radio to
//!    settle and advertise again.
//!
//! Nothing in a tick can fail hard. Every problem is reported in the returned
//! [`TickReport`] and the next tick starts fresh.

use embassy_time::{Duration, Instant};
use embedded_hal_async::delay::DelayNs;

use crate::system::config::{INITIAL_READABLE_VALUE, READVERTISE_GRACE};
use crate::system::connection::{ConnectionState, Edge};
use crate::system::notification::{Delivery, NotificationPolicy, PolicyConfig, Reading};
use crate::system::ranging::{RangeSensor, RawSample};
use crate::system::smoothing::DistanceFilter;
use crate::system::transport::{Transport, TransportError, DISTANCE_CHARACTERISTIC, DISTANCE_SERVICE};

/// What happened during one tick
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    pub sample: RawSample,
    /// Present when the sample was in range
    pub reading: Option<Reading>,
    /// Result of refreshing the readable value, present with `reading`
    pub readable: Option<Result<(), TransportError>>,
    /// Policy outcome, present with `reading`
    pub delivery: Option<Delivery>,
    pub edge: Edge,
    /// Result of re-advertising, present after a disconnect edge
    pub advertised: Option<Result<(), TransportError>>,
}

/// Sample → filter → notify → connection edge, once per tick
pub struct Pipeline<'a, S, T, D> {
    sensor: S,
    transport: T,
    delay: D,
    connection: &'a ConnectionState,
    filter: DistanceFilter,
    policy: NotificationPolicy,
    grace: Duration,
}

impl<'a, S, T, D> Pipeline<'a, S, T, D>
where
    S: RangeSensor,
    T: Transport,
    D: DelayNs,
{
    pub fn new(sensor: S, transport: T, delay: D, connection: &'a ConnectionState, policy: PolicyConfig) -> Self {
        Self {
            sensor,
            transport,
            delay,
            connection,
            filter: DistanceFilter::new(),
            policy: NotificationPolicy::new(policy),
            grace: READVERTISE_GRACE,
        }
    }

    /// Delay between a disconnect edge and advertising again
    pub fn set_readvertise_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Publishes the initial readable value and starts advertising
    pub async fn start(&mut self) -> Result<(), TransportError> {
        self.transport
            .set_readable_value(DISTANCE_CHARACTERISTIC, INITIAL_READABLE_VALUE.as_bytes())
            .await?;
        self.transport.advertise(DISTANCE_SERVICE).await
    }

    /// Runs one tick at time `now`
    pub async fn tick(&mut self, now: Instant) -> TickReport {
        let sample = self.sensor.measure().await;
        let mut report = TickReport {
            sample,
            reading: None,
            readable: None,
            delivery: None,
            edge: Edge::None,
            advertised: None,
        };

        if let Some(raw_cm) = sample.distance_cm() {
            let reading = Reading {
                raw_cm,
                smoothed_cm: self.filter.update(raw_cm),
            };
            report.readable = Some(self.refresh_readable(&reading).await);
            report.delivery = Some(
                self.policy
                    .notify(now, &reading, self.connection.is_connected(), &mut self.transport)
                    .await,
            );
            report.reading = Some(reading);
        }

        report.edge = self.connection.poll_edge();
        if report.edge == Edge::JustDisconnected {
            self.delay.delay_ms(self.grace.as_millis() as u32).await;
            report.advertised = Some(self.transport.advertise(DISTANCE_SERVICE).await);
        }

        report
    }

    async fn refresh_readable(&mut self, reading: &Reading) -> Result<(), TransportError> {
        let payload = self
            .policy
            .config()
            .payload_format()
            .render(reading)
            .map_err(|_| TransportError::Encoding)?;
        self.transport
            .set_readable_value(DISTANCE_CHARACTERISTIC, payload.as_bytes())
            .await
    }

    pub fn filter(&self) -> &DistanceFilter {
        &self.filter
    }

    pub fn policy(&self) -> &NotificationPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
