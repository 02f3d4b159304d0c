//! Build-time configuration.
//!
//! Values come from environment variables read at compile time, so a
//! kernel build selects them without code changes:
//!
//! - `OCS_LOG_LEVEL`: `off`, `error`, `warn`, `info` (default), `debug`, `trace`
//! - `OCS_SERIAL_BAUD`: decimal baud rate, default 9600

use log::LevelFilter;

/// Maximum log level enabled once the serial logger is installed.
pub const MAX_LOG_LEVEL: LevelFilter = match option_env!("OCS_LOG_LEVEL") {
    Some(level) => match level.as_bytes() {
        b"off" => LevelFilter::Off,
        b"error" => LevelFilter::Error,
        b"warn" => LevelFilter::Warn,
        b"debug" => LevelFilter::Debug,
        b"trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    },
    None => LevelFilter::Info,
};

/// Serial line rate in baud.
pub const SERIAL_BAUD: u32 = match option_env!("OCS_SERIAL_BAUD") {
    Some(baud) => parse_decimal(baud, DEFAULT_BAUD),
    None => DEFAULT_BAUD,
};

const DEFAULT_BAUD: u32 = 9600;

/// Bytes the transmit queue holds before `put` applies backpressure.
pub const TX_QUEUE_SIZE: usize = 256;
/// Bytes the receive ring holds before new input is dropped.
pub const RX_QUEUE_SIZE: usize = 32;

/// Backing slots for the transmit ring (one slot stays free).
pub const TX_RING_SLOTS: usize = TX_QUEUE_SIZE + 1;
/// Backing slots for the receive ring (one slot stays free).
pub const RX_RING_SLOTS: usize = RX_QUEUE_SIZE + 1;

/// TOD transitions counted while calibrating the E-clock.
pub const CALIBRATION_TRANSITIONS: u32 = 128;

/// Parses a non-empty decimal `u32`, or returns `default`.
const fn parse_decimal(s: &str, default: u32) -> u32 {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return default;
    }
    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if !b.is_ascii_digit() {
            return default;
        }
        value = match value.checked_mul(10) {
            Some(v) => match v.checked_add((b - b'0') as u32) {
                Some(v) => v,
                None => return default,
            },
            None => return default,
        };
        i += 1;
    }
    if value == 0 { default } else { value }
}
