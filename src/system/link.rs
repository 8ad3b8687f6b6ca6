//! Radio Bridge Link
//!
//! The board has no radio of its own. The BLE stack runs on a companion module
//! attached over UART, and the two sides talk in short ASCII lines terminated
//! by `\n`.
//!
//! # Host to radio
//! - `NAME <name>` sets the advertised device name
//! - `ADV <service-uuid>` (re)starts advertising
//! - `NTF <char-uuid> <payload>` notifies the subscribed observer
//! - `VAL <char-uuid> <payload>` sets the value served for direct reads
//!
//! # Radio to host
//! - `CONN` an observer connected
//! - `DISC` the observer disconnected
//! - `ERR NOTCONN` a notify arrived after the observer left
//!
//! [`BridgeTransport`] implements [`Transport`] on top of the UART writer,
//! [`LineReader`] and [`LinkEvent::parse`] handle the reading side.

use embedded_io_async::Write;
use heapless::Vec;

use crate::system::connection::{ConnectionObserver, ConnectionState};
use crate::system::transport::{CharacteristicId, ServiceId, Transport, TransportError};

/// Longest line in either direction, terminator included
pub const MAX_LINE: usize = 96;

/// One encoded or received line
pub type Line = Vec<u8, MAX_LINE>;

/// Lines sent to the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkCommand<'a> {
    Name(&'a str),
    Advertise(ServiceId),
    Notify(CharacteristicId, &'a [u8]),
    SetValue(CharacteristicId, &'a [u8]),
}

impl LinkCommand<'_> {
    /// Encodes the command as a `\n` terminated line
    ///
    /// Arguments may not contain line breaks and the line must fit
    /// [`MAX_LINE`].
    pub fn encode(&self) -> Result<Line, TransportError> {
        let mut line = Line::new();
        match self {
            LinkCommand::Name(name) => {
                push(&mut line, b"NAME ")?;
                push_text(&mut line, name.as_bytes())?;
            }
            LinkCommand::Advertise(service) => {
                push(&mut line, b"ADV ")?;
                push_text(&mut line, service.0.as_bytes())?;
            }
            LinkCommand::Notify(characteristic, payload) => {
                push(&mut line, b"NTF ")?;
                push_text(&mut line, characteristic.0.as_bytes())?;
                push(&mut line, b" ")?;
                push_text(&mut line, payload)?;
            }
            LinkCommand::SetValue(characteristic, payload) => {
                push(&mut line, b"VAL ")?;
                push_text(&mut line, characteristic.0.as_bytes())?;
                push(&mut line, b" ")?;
                push_text(&mut line, payload)?;
            }
        }
        push(&mut line, b"\n")?;
        Ok(line)
    }
}

fn push(line: &mut Line, bytes: &[u8]) -> Result<(), TransportError> {
    line.extend_from_slice(bytes).map_err(|_| TransportError::Encoding)
}

fn push_text(line: &mut Line, text: &[u8]) -> Result<(), TransportError> {
    if text.iter().any(|b| matches!(b, b'\n' | b'\r')) {
        return Err(TransportError::Encoding);
    }
    push(line, text)
}

/// Lines received from the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    Connected,
    Disconnected,
    /// A notify was dropped by the radio because nobody is connected
    NotConnected,
}

impl LinkEvent {
    /// Parses one line, with or without terminator. Unknown lines give `None`.
    pub fn parse(line: &[u8]) -> Option<Self> {
        match line.trim_ascii() {
            b"CONN" => Some(LinkEvent::Connected),
            b"DISC" => Some(LinkEvent::Disconnected),
            b"ERR NOTCONN" => Some(LinkEvent::NotConnected),
            _ => None,
        }
    }

    /// Forwards connection changes to `observer`
    pub fn dispatch<O: ConnectionObserver + ?Sized>(&self, observer: &O) {
        match self {
            LinkEvent::Connected => observer.on_connect(),
            LinkEvent::Disconnected => observer.on_disconnect(),
            LinkEvent::NotConnected => {}
        }
    }
}

/// A received line did not fit [`MAX_LINE`] and was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineTooLong;

/// Splits the incoming byte stream into lines
#[derive(Debug, Default)]
pub struct LineReader {
    buffer: Line,
    overflowed: bool,
}

impl LineReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one byte, returning a completed line (without terminator)
    pub fn push(&mut self, byte: u8) -> Option<Result<Line, LineTooLong>> {
        if byte == b'\n' {
            let line = core::mem::take(&mut self.buffer);
            if core::mem::take(&mut self.overflowed) {
                return Some(Err(LineTooLong));
            }
            return Some(Ok(line));
        }
        if !self.overflowed && self.buffer.push(byte).is_err() {
            self.overflowed = true;
            self.buffer.clear();
        }
        None
    }
}

/// [`Transport`] speaking the bridge protocol over a UART writer
///
/// Sends are refused locally while no observer is connected, the same answer
/// the radio would give with `ERR NOTCONN`.
pub struct BridgeTransport<'a, W> {
    writer: W,
    connection: &'a ConnectionState,
}

impl<'a, W: Write> BridgeTransport<'a, W> {
    pub fn new(writer: W, connection: &'a ConnectionState) -> Self {
        Self { writer, connection }
    }

    /// Sets the advertised device name
    pub async fn set_name(&mut self, name: &str) -> Result<(), TransportError> {
        self.send(LinkCommand::Name(name)).await
    }

    async fn send(&mut self, command: LinkCommand<'_>) -> Result<(), TransportError> {
        let line = command.encode()?;
        self.writer.write_all(&line).await.map_err(|_| TransportError::Io)?;
        self.writer.flush().await.map_err(|_| TransportError::Io)
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<W: Write> Transport for BridgeTransport<'_, W> {
    async fn advertise(&mut self, service: ServiceId) -> Result<(), TransportError> {
        self.send(LinkCommand::Advertise(service)).await
    }

    async fn notify(&mut self, characteristic: CharacteristicId, payload: &[u8]) -> Result<(), TransportError> {
        if !self.connection.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.send(LinkCommand::Notify(characteristic, payload)).await
    }

    async fn set_readable_value(
        &mut self,
        characteristic: CharacteristicId,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        self.send(LinkCommand::SetValue(characteristic, payload)).await
    }
}
