//! Platform layer for 68k machines built around Paula and two 8520 CIAs.
//!
//! - [`interrupt`]: flattens the six CPU levels, 14 Paula lines and 2×5 CIA
//!   sources into logical vectors 1 to 24 and dispatches to handlers.
//! - [`timer`]: calibrates the E-clock against the TOD counter, keeps
//!   monotonic time on CIA-B Timer A, and drives the kernel alarm on Timer B.
//! - [`serial`]: the Paula UART with a worker-drained transmit queue, a
//!   polled path for panics, and an interrupt-filled receive ring.
//! - [`platform`]: boot order and the entry points the kernel calls.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod interrupt;
pub mod platform;
pub mod regs;
pub mod serial;
pub mod timer;

pub use interrupt::{InterruptDemux, InterruptStats};
pub use platform::Platform;
pub use serial::Serial;
pub use timer::CiaClock;
