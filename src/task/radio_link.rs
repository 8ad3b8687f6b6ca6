//! Radio link
//!
//! UART connection to the companion BLE module.
//!
//! The transmit half is handed to the range pipeline, which wraps it in a
//! `BridgeTransport`. The receive half is owned by the `radio_link` task, which
//! splits the incoming stream into lines and turns `CONN`/`DISC` reports into
//! connection callbacks.
//!
//! # Connection Flag
//! [`CONNECTION`] is the one piece of state shared between the two tasks.
//! Callbacks are single atomic stores, the pipeline picks up the change on its
//! next tick.

use defmt::{info, warn};
use embassy_rp::uart::{BufferedUart, BufferedUartRx, BufferedUartTx, Config};
use embedded_io_async::Read;
use sonar_beacon::system::connection::ConnectionState;
use sonar_beacon::system::link::{LineReader, LinkEvent};
use static_cell::StaticCell;

use crate::task::resources::{Irqs, RadioUartResources};

/// Baud rate the radio module is configured for
const BAUD_RATE: u32 = 115_200;

/// UART ring buffer sizes, a few lines worth each
const TX_BUFFER_SIZE: usize = 256;
const RX_BUFFER_SIZE: usize = 128;

/// Observer connection as reported by the radio
pub static CONNECTION: ConnectionState = ConnectionState::new();

static TX_BUFFER: StaticCell<[u8; TX_BUFFER_SIZE]> = StaticCell::new();
static RX_BUFFER: StaticCell<[u8; RX_BUFFER_SIZE]> = StaticCell::new();

/// Sets up the UART and splits it into transmit and receive halves
///
/// Must only be called once, the ring buffers are handed out for good.
pub fn init_uart(r: RadioUartResources) -> (BufferedUartTx, BufferedUartRx) {
    let mut config = Config::default();
    config.baudrate = BAUD_RATE;
    let tx_buffer = TX_BUFFER.init([0; TX_BUFFER_SIZE]);
    let rx_buffer = RX_BUFFER.init([0; RX_BUFFER_SIZE]);
    let uart = BufferedUart::new(r.uart, r.tx_pin, r.rx_pin, Irqs, tx_buffer, rx_buffer, config);
    uart.split()
}

/// Reads status lines from the radio and updates [`CONNECTION`]
#[embassy_executor::task]
pub async fn radio_link(mut rx: BufferedUartRx) {
    info!("Radio link started");
    let mut reader = LineReader::new();
    let mut chunk = [0u8; 32];

    loop {
        let received = match rx.read(&mut chunk).await {
            Ok(received) => received,
            Err(e) => {
                warn!("radio link read failed: {:?}", e);
                continue;
            }
        };

        for &byte in &chunk[..received] {
            match reader.push(byte) {
                None => {}
                Some(Ok(line)) => match LinkEvent::parse(&line) {
                    Some(event) => {
                        match event {
                            LinkEvent::Connected => info!("Observer connected"),
                            LinkEvent::Disconnected => info!("Observer disconnected"),
                            LinkEvent::NotConnected => warn!("Radio dropped a notify, no observer"),
                        }
                        event.dispatch(&CONNECTION);
                    }
                    None => warn!("Unknown radio line: {=[u8]:a}", &line[..]),
                },
                Some(Err(_)) => warn!("Radio line too long, dropped"),
            }
        }
    }
}
