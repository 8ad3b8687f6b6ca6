//! Wireless transport interface
//!
//! The radio stack itself (GATT registration, advertising, pairing) lives
//! outside this crate. The pipeline only needs to advertise, push a
//! notification and update the value served for direct reads.

/// GATT service identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceId(pub &'static str);

/// GATT characteristic identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharacteristicId(pub &'static str);

/// Service the distance characteristic is registered under
pub const DISTANCE_SERVICE: ServiceId = ServiceId("8552e3be-a094-43ca-80be-6e21c69d7874");

/// Read/notify characteristic carrying the distance payload
pub const DISTANCE_CHARACTERISTIC: CharacteristicId = CharacteristicId("f0cee6f7-dd4a-4146-8efb-2bdb450fec95");

/// Transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No observer attached, usually a disconnect racing the send
    NotConnected,
    /// Payload could not be encoded for the link
    Encoding,
    /// Writing to the radio failed
    Io,
}

/// Narrow view of the radio stack used by the pipeline
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// (Re)starts advertising `service`
    async fn advertise(&mut self, service: ServiceId) -> Result<(), TransportError>;

    /// Pushes `payload` to the connected observer
    async fn notify(&mut self, characteristic: CharacteristicId, payload: &[u8]) -> Result<(), TransportError>;

    /// Sets the value returned to a direct read of `characteristic`
    async fn set_readable_value(
        &mut self,
        characteristic: CharacteristicId,
        payload: &[u8],
    ) -> Result<(), TransportError>;
}
