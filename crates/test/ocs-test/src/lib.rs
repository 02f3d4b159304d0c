//! Host-side test harness for the OCS platform layer.
//!
//! - [`MockBus`] stands in for the chipset: register reads can be preset,
//!   scripted or computed by hooks, and every access is logged.
//! - [`HostKernel`] and [`HostEvent`] implement the kernel service contract
//!   on top of std threads, with an optional deferred mode for tests that
//!   need the worker stalled.

#![warn(missing_docs)]

pub mod bus;
pub mod kernel;

pub use bus::{Access, MockBus};
pub use kernel::{HostEvent, HostKernel};

use std::time::{Duration, Instant};

/// Moves `value` to the heap and leaks it, yielding the `&'static` the
/// platform layer expects for its long-lived components.
pub fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

/// Polls `cond` until it holds or five seconds pass.
///
/// Returns the final value of `cond`.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}
