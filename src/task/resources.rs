//! Hardware Resource Management
//!
//! Assigns the board's pins and peripherals to the tasks that own them.
//!
//! # Resource Groups
//! - Distance Sensor: HC-SR04 trigger and echo pins
//! - Radio Link: UART0 to the companion BLE module
//!
//! Nothing is shared between tasks here, the only state both tasks touch is
//! the connection flag in `radio_link`.

use assign_resources::assign_resources;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{self, UART0};
use embassy_rp::uart::BufferedInterruptHandler;

assign_resources! {
    /// HC-SR04 ultrasonic distance sensor pins
    distance_sensor: DistanceSensorResources {
        trigger_pin: PIN_15,
        echo_pin: PIN_14,
    },
    /// UART to the companion radio module
    radio_uart: RadioUartResources {
        uart: UART0,
        tx_pin: PIN_0,
        rx_pin: PIN_1,
    },
}

bind_interrupts!(pub struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});
