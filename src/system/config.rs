//! Configuration defaults
//!
//! Everything the firmware can be tuned with lives here as a named constant.
//! The per-component config structs (`SamplerConfig`, `PolicyConfig`) take
//! their defaults from these values.
//!
//! # Timing
//! - One measurement tick per second
//! - At most one notification per second
//! - 500ms grace period before advertising again after a disconnect
//!
//! # Ranging
//! - 10µs trigger pulse, preceded by 2µs of low level
//! - 38ms echo timeout, which is what the HC-SR04 holds echo high for when
//!   nothing is in range
//! - 58µs of round trip per centimetre (speed of sound at roughly 20°C)

use embassy_time::Duration;

/// Time between pipeline ticks
pub const TICK_PERIOD: Duration = Duration::from_millis(1000);

/// Minimum time between two notifications
pub const NOTIFY_INTERVAL: Duration = Duration::from_millis(1000);

/// Delay between a detected disconnect and re-advertising, the radio needs
/// time to finish tearing down the old link
pub const READVERTISE_GRACE: Duration = Duration::from_millis(500);

/// Distance below which notifications are sent when threshold gating is on (cm)
pub const NOTIFY_THRESHOLD_CM: f32 = 30.0;

/// Number of samples in the moving average window
pub const SMOOTHING_WINDOW: usize = 10;

/// Low time before the trigger pulse (µs)
pub const TRIGGER_SETTLE_US: u32 = 2;

/// Trigger pulse width (µs)
pub const TRIGGER_PULSE_US: u32 = 10;

/// Upper bound for waiting on the echo (µs)
pub const ECHO_TIMEOUT_US: u64 = 38_000;

/// Round trip time per centimetre of distance (µs/cm)
pub const US_PER_CM_ROUND_TRIP: f32 = 58.0;

/// Name the radio advertises under
pub const DEVICE_NAME: &str = "ASH_ESP32";

/// Value served for direct reads before the first measurement
pub const INITIAL_READABLE_VALUE: &str = "Hello World";
