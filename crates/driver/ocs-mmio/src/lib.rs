//! Typed register block abstractions.
//!
//! Register maps are declared with [`register_block!`], which generates an
//! accessor struct over any [`RegisterBus`]. On the target the bus is
//! [`Mmio`], a zero-sized volatile accessor; host tests substitute a mock so
//! the same register maps can be exercised without hardware.
//!
//! # Example
//!
//! ```ignore
//! use ocs_mmio::register_block;
//!
//! register_block! {
//!     /// Paula interrupt registers.
//!     pub IrqRegs {
//!         /// Interrupt enable read-back.
//!         [0x01C; u16; ro] intenar,
//!         /// Interrupt enable, set/clear by bit 15.
//!         [0x09A; u16; wo] intena,
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate self as ocs_mmio;

pub use ocs_mmio_macros::register_block;

/// Byte-addressed access to device registers.
///
/// Addresses are absolute. Implementations must perform each access exactly
/// once and in program order; several registers have side effects on read.
pub trait RegisterBus: Sync {
    /// Reads an 8-bit register.
    fn read_u8(&self, addr: usize) -> u8;
    /// Reads a 16-bit register.
    fn read_u16(&self, addr: usize) -> u16;
    /// Reads a 32-bit register.
    fn read_u32(&self, addr: usize) -> u32;
    /// Writes an 8-bit register.
    fn write_u8(&self, addr: usize, value: u8);
    /// Writes a 16-bit register.
    fn write_u16(&self, addr: usize, value: u16);
    /// Writes a 32-bit register.
    fn write_u32(&self, addr: usize, value: u32);
}

/// Volatile memory-mapped register bus.
#[derive(Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Creates the bus.
    ///
    /// # Safety
    ///
    /// Every address later passed to this bus must be a mapped device
    /// register of the width used to access it.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterBus for Mmio {
    #[inline]
    fn read_u8(&self, addr: usize) -> u8 {
        // SAFETY: Caller of `Mmio::new` guarantees `addr` is a mapped register.
        unsafe { core::ptr::read_volatile(addr as *const u8) }
    }

    #[inline]
    fn read_u16(&self, addr: usize) -> u16 {
        // SAFETY: Caller of `Mmio::new` guarantees `addr` is a mapped register.
        unsafe { core::ptr::read_volatile(addr as *const u16) }
    }

    #[inline]
    fn read_u32(&self, addr: usize) -> u32 {
        // SAFETY: Caller of `Mmio::new` guarantees `addr` is a mapped register.
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    #[inline]
    fn write_u8(&self, addr: usize, value: u8) {
        // SAFETY: Caller of `Mmio::new` guarantees `addr` is a mapped register.
        unsafe { core::ptr::write_volatile(addr as *mut u8, value) }
    }

    #[inline]
    fn write_u16(&self, addr: usize, value: u16) {
        // SAFETY: Caller of `Mmio::new` guarantees `addr` is a mapped register.
        unsafe { core::ptr::write_volatile(addr as *mut u16, value) }
    }

    #[inline]
    fn write_u32(&self, addr: usize, value: u32) {
        // SAFETY: Caller of `Mmio::new` guarantees `addr` is a mapped register.
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }
}
