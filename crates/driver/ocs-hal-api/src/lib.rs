//! Boundary contract between the OCS platform layer and its kernel.
//!
//! - **Downward**: [`KernelServices`], [`Event`] and [`Worker`] are what the
//!   platform layer needs from the kernel (events, worker threads, interrupt
//!   state).
//! - **Upward**: [`Vector`], [`IrqHandler`], [`AlarmHandler`] and
//!   [`IrqReturn`] are what the kernel hands to the platform layer when it
//!   registers interrupt and alarm callbacks.

#![cfg_attr(not(test), no_std)]

pub mod error;
pub mod irq;
pub mod services;

pub use error::HalError;
pub use irq::{AlarmHandler, IrqHandler, IrqReturn, Vector};
pub use services::{Event, KernelServices, Worker};
