//! Core synchronization primitives for the OCS platform layer.
//!
//! These types live outside `ocs-hal` so they can be tested with
//! `cargo test` and loom on the host without a 68k target. On the target
//! they mask interrupts through the status register; on the host the
//! interrupt half is a no-op and only the spin lock remains.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(
    all(target_os = "none", target_arch = "m68k"),
    feature(asm_experimental_arch)
)]
#![warn(missing_docs)]

pub mod sync;
