//! Sonar beacon firmware entry point
//!
//! Initializes the RP2350, hands the pins to their tasks and spawns the range
//! pipeline and the radio link.

#![no_std]
#![no_main]

use crate::task::{radio_link, radio_link::radio_link, range_pipeline::range_pipeline};
use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_rp::config::Config;
use task::resources::{AssignedResources, DistanceSensorResources, RadioUartResources};
use {defmt_rtt as _, panic_probe as _};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// Task implementations
mod task;

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());

    // Split the resources into separate groups for each task
    let r = split_resources!(p);

    // The radio link has to be up before the pipeline starts advertising through it
    let (uart_tx, uart_rx) = radio_link::init_uart(r.radio_uart);
    spawner.spawn(radio_link(uart_rx)).unwrap();
    spawner.spawn(range_pipeline(r.distance_sensor, uart_tx)).unwrap();
}
