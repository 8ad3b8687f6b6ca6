//! Host side fakes for pins, clocks, delays, sensors and transports

use core::convert::Infallible;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use embassy_time::Duration;

use crate::system::config::US_PER_CM_ROUND_TRIP;
use crate::system::ranging::{Clock, Echo, OutOfRange, RangeSensor, RawSample};
use crate::system::transport::{CharacteristicId, ServiceId, Transport, TransportError};

/// Clock shared by the fake pins and delays, moves only when they move it
#[derive(Clone, Default)]
pub struct FakeClock {
    now: Rc<Cell<u64>>,
}

impl FakeClock {
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    pub fn advance(&self, us: u64) {
        self.now.set(self.now.get().saturating_add(us));
    }

    /// Jumps forward to `at`, never backwards
    pub fn advance_to(&self, at: u64) {
        self.now.set(self.now.get().max(at));
    }
}

impl Clock for FakeClock {
    fn now_micros(&self) -> u64 {
        self.now.get()
    }
}

/// Echo line that is high during `[rise, fall)` of the shared clock
///
/// Waiting for an edge jumps the clock to it. An edge that never comes (no
/// window, or `fall == u64::MAX`) keeps the wait pending forever.
pub struct EchoPin {
    clock: FakeClock,
    window: Option<(u64, u64)>,
}

impl EchoPin {
    pub fn new(clock: FakeClock, window: Option<(u64, u64)>) -> Self {
        Self { clock, window }
    }
}

impl embedded_hal::digital::ErrorType for EchoPin {
    type Error = Infallible;
}

impl embedded_hal_async::digital::Wait for EchoPin {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        match self.window {
            Some((rise, fall)) if self.clock.now() < fall => {
                self.clock.advance_to(rise);
                Ok(())
            }
            _ => core::future::pending().await,
        }
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        match self.window {
            Some((rise, fall)) if self.clock.now() >= rise => {
                if fall == u64::MAX {
                    core::future::pending::<()>().await;
                }
                self.clock.advance_to(fall);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        self.wait_for_high().await
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        self.wait_for_low().await
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        self.wait_for_high().await
    }
}

/// Pin whose every operation fails
pub struct FaultyPin;

impl embedded_hal::digital::ErrorType for FaultyPin {
    type Error = embedded_hal::digital::ErrorKind;
}

impl embedded_hal::digital::OutputPin for FaultyPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(embedded_hal::digital::ErrorKind::Other)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(embedded_hal::digital::ErrorKind::Other)
    }
}

impl embedded_hal_async::digital::Wait for FaultyPin {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        Err(embedded_hal::digital::ErrorKind::Other)
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        Err(embedded_hal::digital::ErrorKind::Other)
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        Err(embedded_hal::digital::ErrorKind::Other)
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        Err(embedded_hal::digital::ErrorKind::Other)
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        Err(embedded_hal::digital::ErrorKind::Other)
    }
}

/// Trigger line recording every level it is driven to
#[derive(Clone, Default)]
pub struct TriggerPin {
    levels: Rc<RefCell<Vec<bool>>>,
}

impl TriggerPin {
    pub fn history(&self) -> Vec<bool> {
        self.levels.borrow().clone()
    }
}

impl embedded_hal::digital::ErrorType for TriggerPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for TriggerPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

/// Async delay that moves the shared clock and remembers microsecond waits
pub struct ClockDelay {
    clock: FakeClock,
    delays_us: Vec<u32>,
}

impl ClockDelay {
    pub fn new(clock: FakeClock) -> Self {
        Self {
            clock,
            delays_us: Vec::new(),
        }
    }

    pub fn delays_us(&self) -> Vec<u32> {
        self.delays_us.clone()
    }
}

impl embedded_hal_async::delay::DelayNs for ClockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.clock.advance(u64::from(ns).div_ceil(1000));
    }

    async fn delay_us(&mut self, us: u32) {
        self.delays_us.push(us);
        self.clock.advance(u64::from(us));
    }
}

/// Async delay that returns at once and remembers what was asked for
#[derive(Default)]
pub struct RecordingDelay {
    delays_ms: Vec<u32>,
}

impl RecordingDelay {
    pub fn delays_ms(&self) -> Vec<u32> {
        self.delays_ms.clone()
    }
}

impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.delays_ms.push(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
    }
}

/// Sensor replaying a fixed list of samples, out of range once exhausted
pub struct FakeSensor {
    samples: VecDeque<RawSample>,
}

impl FakeSensor {
    pub fn new(samples: &[RawSample]) -> Self {
        Self {
            samples: samples.iter().copied().collect(),
        }
    }

    /// In range sample at `distance_cm` with the default calibration
    pub fn cm(distance_cm: f32) -> RawSample {
        RawSample::Echo(Echo {
            round_trip: Duration::from_micros((distance_cm * US_PER_CM_ROUND_TRIP) as u64),
            distance_cm,
        })
    }
}

impl RangeSensor for FakeSensor {
    async fn measure(&mut self) -> RawSample {
        self.samples
            .pop_front()
            .unwrap_or(RawSample::OutOfRange(OutOfRange::NoEcho))
    }
}

/// Something a [`FakeTransport`] was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Advertise(ServiceId),
    Notify(CharacteristicId, String),
    Value(CharacteristicId, String),
}

/// Transport recording every call, notify can be made to fail
#[derive(Default)]
pub struct FakeTransport {
    sent: Vec<Sent>,
    notify_error: Option<TransportError>,
}

impl FakeTransport {
    pub fn connected() -> Self {
        Self::default()
    }

    /// Makes every following notify fail with `error`
    pub fn fail_with(&mut self, error: TransportError) {
        self.notify_error = Some(error);
    }

    pub fn recover(&mut self) {
        self.notify_error = None;
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.clone()
    }
}

impl Transport for FakeTransport {
    async fn advertise(&mut self, service: ServiceId) -> Result<(), TransportError> {
        self.sent.push(Sent::Advertise(service));
        Ok(())
    }

    async fn notify(&mut self, characteristic: CharacteristicId, payload: &[u8]) -> Result<(), TransportError> {
        if let Some(error) = self.notify_error {
            return Err(error);
        }
        let payload = String::from_utf8_lossy(payload).into_owned();
        self.sent.push(Sent::Notify(characteristic, payload));
        Ok(())
    }

    async fn set_readable_value(
        &mut self,
        characteristic: CharacteristicId,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let payload = String::from_utf8_lossy(payload).into_owned();
        self.sent.push(Sent::Value(characteristic, payload));
        Ok(())
    }
}

/// UART writer collecting everything written
#[derive(Default)]
pub struct UartLog {
    bytes: Vec<u8>,
}

impl UartLog {
    /// Written data split into lines, terminators removed
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.bytes)
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl embedded_io_async::ErrorType for UartLog {
    type Error = Infallible;
}

impl embedded_io_async::Write for UartLog {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// UART writer failing every write
pub struct BrokenWriter;

impl embedded_io_async::ErrorType for BrokenWriter {
    type Error = embedded_io_async::ErrorKind;
}

impl embedded_io_async::Write for BrokenWriter {
    async fn write(&mut self, _buf: &[u8]) -> Result<usize, Self::Error> {
        Err(embedded_io_async::ErrorKind::BrokenPipe)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Err(embedded_io_async::ErrorKind::BrokenPipe)
    }
}
