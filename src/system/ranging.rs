//! Ultrasonic ranging
//!
//! Drives the HC-SR04 trigger/echo protocol and turns the echo pulse width into
//! a distance.
//!
//! # Sensor Operation
//! - Trigger line is held low briefly, then pulsed high for 10µs
//! - The sensor answers by holding echo high for the round trip time
//! - Round trip time divided by the calibration constant gives centimetres
//!
//! # Timeouts
//! Both the wait for the echo to start and the echo pulse itself are bounded
//! by the echo timeout. Running into either bound yields an out-of-range
//! sample, never a zero distance, so "nothing in range" can not be mistaken
//! for "object touching the sensor". An edge seen exactly at the bound counts
//! as a timeout.
//!
//! Edges are awaited, not polled, so other tasks keep running while the
//! sound is in flight.
//!
//! There are no retries here. A failed measurement is reported once and the
//! caller decides what to do with it.

use embassy_futures::select::{select, Either};
use embassy_time::Duration;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;

use crate::system::config::{ECHO_TIMEOUT_US, TRIGGER_PULSE_US, TRIGGER_SETTLE_US, US_PER_CM_ROUND_TRIP};

/// Monotonic microsecond time source used to time the echo pulse
pub trait Clock {
    /// Current time in microseconds, must never go backwards
    fn now_micros(&self) -> u64;
}

/// Anything that can produce one raw sample per call
#[allow(async_fn_in_trait)]
pub trait RangeSensor {
    async fn measure(&mut self) -> RawSample;
}

/// Why a measurement produced no distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutOfRange {
    /// Echo line never went high within the timeout
    NoEcho,
    /// Echo line stayed high for the whole timeout
    EchoTooLong,
    /// Reading or driving a pin failed
    PinFault,
}

/// A valid echo and the distance it converts to
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Echo {
    /// Echo pulse width, i.e. time for the sound to travel there and back
    pub round_trip: Duration,
    /// Distance to the object in centimetres
    pub distance_cm: f32,
}

impl Echo {
    /// Converts a round trip time using the given calibration (µs per cm)
    pub fn from_round_trip(round_trip: Duration, us_per_cm: f32) -> Self {
        Self {
            round_trip,
            distance_cm: round_trip.as_micros() as f32 / us_per_cm,
        }
    }
}

/// Result of a single measurement
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RawSample {
    Echo(Echo),
    OutOfRange(OutOfRange),
}

impl RawSample {
    /// Distance in centimetres, `None` for out-of-range samples
    pub fn distance_cm(&self) -> Option<f32> {
        match self {
            RawSample::Echo(echo) => Some(echo.distance_cm),
            RawSample::OutOfRange(_) => None,
        }
    }
}

/// Sampler timing and calibration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SamplerConfig {
    settle_us: u32,
    pulse_us: u32,
    echo_timeout: Duration,
    us_per_cm: f32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            settle_us: TRIGGER_SETTLE_US,
            pulse_us: TRIGGER_PULSE_US,
            echo_timeout: Duration::from_micros(ECHO_TIMEOUT_US),
            us_per_cm: US_PER_CM_ROUND_TRIP,
        }
    }
}

impl SamplerConfig {
    /// Trigger high time, the HC-SR04 needs at least 10µs
    pub fn set_pulse_width_us(mut self, pulse_us: u32) -> Self {
        self.pulse_us = pulse_us;
        self
    }

    pub fn set_echo_timeout(mut self, timeout: Duration) -> Self {
        self.echo_timeout = timeout;
        self
    }

    /// Round trip microseconds per centimetre, depends on the speed of sound
    pub fn set_us_per_cm(mut self, us_per_cm: f32) -> Self {
        self.us_per_cm = us_per_cm;
        self
    }

    pub fn pulse_width_us(&self) -> u32 {
        self.pulse_us
    }

    pub fn echo_timeout(&self) -> Duration {
        self.echo_timeout
    }

    pub fn us_per_cm(&self) -> f32 {
        self.us_per_cm
    }
}

/// HC-SR04 style sampler over embedded-hal pins
pub struct RangeSampler<TRIG, ECHO, DELAY, CLOCK> {
    trigger: TRIG,
    echo: ECHO,
    delay: DELAY,
    clock: CLOCK,
    config: SamplerConfig,
}

impl<TRIG, ECHO, DELAY, CLOCK> RangeSampler<TRIG, ECHO, DELAY, CLOCK>
where
    TRIG: OutputPin,
    ECHO: Wait,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    pub fn new(trigger: TRIG, echo: ECHO, delay: DELAY, clock: CLOCK, config: SamplerConfig) -> Self {
        Self {
            trigger,
            echo,
            delay,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Emits the trigger pulse, making sure the line was low beforehand
    async fn fire_trigger(&mut self) -> Result<(), OutOfRange> {
        self.trigger.set_low().map_err(|_| OutOfRange::PinFault)?;
        self.delay.delay_us(self.config.settle_us).await;
        self.trigger.set_high().map_err(|_| OutOfRange::PinFault)?;
        self.delay.delay_us(self.config.pulse_us).await;
        self.trigger.set_low().map_err(|_| OutOfRange::PinFault)
    }

    /// Waits for the echo line to reach `high`, returning the time it did.
    ///
    /// Gives up with `expired` once `limit_us` have passed since `since`.
    async fn wait_for_echo(&mut self, high: bool, since: u64, limit_us: u64, expired: OutOfRange) -> Result<u64, OutOfRange> {
        let elapsed = self.clock.now_micros().saturating_sub(since);
        let remaining = u32::try_from(limit_us.saturating_sub(elapsed)).unwrap_or(u32::MAX);

        let echo = &mut self.echo;
        let edge = async move {
            if high {
                echo.wait_for_high().await
            } else {
                echo.wait_for_low().await
            }
        };
        let outcome = select(edge, self.delay.delay_us(remaining)).await;

        let now = self.clock.now_micros();
        match outcome {
            Either::First(Err(_)) => Err(OutOfRange::PinFault),
            Either::First(Ok(())) if now.saturating_sub(since) < limit_us => Ok(now),
            Either::First(Ok(())) | Either::Second(()) => Err(expired),
        }
    }

    async fn time_echo(&mut self) -> Result<Duration, OutOfRange> {
        self.fire_trigger().await?;
        let limit_us = self.config.echo_timeout.as_micros();
        let armed_at = self.clock.now_micros();
        let rise = self.wait_for_echo(true, armed_at, limit_us, OutOfRange::NoEcho).await?;
        let fall = self.wait_for_echo(false, rise, limit_us, OutOfRange::EchoTooLong).await?;
        Ok(Duration::from_micros(fall - rise))
    }
}

impl<TRIG, ECHO, DELAY, CLOCK> RangeSensor for RangeSampler<TRIG, ECHO, DELAY, CLOCK>
where
    TRIG: OutputPin,
    ECHO: Wait,
    DELAY: DelayNs,
    CLOCK: Clock,
{
    async fn measure(&mut self) -> RawSample {
        match self.time_echo().await {
            Ok(round_trip) => RawSample::Echo(Echo::from_round_trip(round_trip, self.config.us_per_cm)),
            Err(reason) => RawSample::OutOfRange(reason),
        }
    }
}
