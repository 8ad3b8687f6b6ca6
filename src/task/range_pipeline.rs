//! Range pipeline
//!
//! Measures the distance once per tick, smooths it and pushes it to the
//! connected observer through the radio link.
//!
//! # Sensor Operation
//! - HC-SR04 on the trigger/echo pins from `resources`
//! - Echo edges awaited on the echo pin, timed with the embassy clock and
//!   bounded at 38ms
//! - Distance reported in centimetres
//!
//! # Delivery
//! - At most one notification per second
//! - Only distances below 30cm are sent
//! - Advertising restarts 500ms after the observer disconnects
//!
//! Out-of-range readings are logged and otherwise ignored, they never reach the
//! filter or the observer.

use defmt::{debug, info, warn};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::uart::BufferedUartTx;
use embassy_time::{Delay, Instant, Ticker};
use sonar_beacon::system::config::{DEVICE_NAME, TICK_PERIOD};
use sonar_beacon::system::connection::Edge;
use sonar_beacon::system::link::BridgeTransport;
use sonar_beacon::system::notification::{Delivery, PolicyConfig};
use sonar_beacon::system::pipeline::{Pipeline, TickReport};
use sonar_beacon::system::ranging::{Clock, RangeSampler, RawSample, SamplerConfig};

use crate::task::radio_link::CONNECTION;
use crate::task::resources::DistanceSensorResources;

/// Echo timing clock backed by the embassy time driver
struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_micros(&self) -> u64 {
        Instant::now().as_micros()
    }
}

/// Main measurement task, runs one pipeline tick per period
#[embassy_executor::task]
pub async fn range_pipeline(r: DistanceSensorResources, uart_tx: BufferedUartTx) {
    info!("Range pipeline started");

    let trigger = Output::new(r.trigger_pin, Level::Low);
    let echo = Input::new(r.echo_pin, Pull::None);
    let sampler = RangeSampler::new(trigger, echo, Delay, EmbassyClock, SamplerConfig::default());

    let mut link = BridgeTransport::new(uart_tx, &CONNECTION);
    if let Err(e) = link.set_name(DEVICE_NAME).await {
        warn!("Could not set device name: {:?}", e);
    }

    let mut pipeline = Pipeline::new(sampler, link, Delay, &CONNECTION, PolicyConfig::default());
    match pipeline.start().await {
        Ok(()) => info!("Characteristic ready, advertising"),
        Err(e) => warn!("Could not start advertising: {:?}", e),
    }

    let mut ticker = Ticker::every(TICK_PERIOD);
    loop {
        let report = pipeline.tick(Instant::now()).await;
        log_report(&report);
        ticker.next().await;
    }
}

fn log_report(report: &TickReport) {
    match report.sample {
        RawSample::Echo(_) => {}
        RawSample::OutOfRange(reason) => warn!("Readings out of range: {:?}", reason),
    }

    if let Some(reading) = &report.reading {
        debug!(
            "Raw Distance: {} cm, Denoised Distance: {} cm",
            reading.raw_cm, reading.smoothed_cm
        );
    }

    if let Some(Err(e)) = report.readable {
        warn!("Could not update readable value: {:?}", e);
    }

    match &report.delivery {
        Some(Delivery::Sent(payload)) => info!("Notify value: {}", payload.as_str()),
        Some(Delivery::SendRace) => debug!("Observer left before the notify, skipped"),
        Some(Delivery::Failed(e)) => warn!("Notify failed: {:?}", e),
        Some(Delivery::Held(_)) | None => {}
    }

    match report.edge {
        Edge::JustConnected => info!("Observer attached, notifications armed"),
        Edge::JustDisconnected => match report.advertised {
            Some(Ok(())) => info!("Start advertising"),
            Some(Err(e)) => warn!("Could not restart advertising: {:?}", e),
            None => {}
        },
        Edge::None => {}
    }
}
