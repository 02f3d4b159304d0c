//! Synchronization primitives shared between interrupt handlers and
//! schedulable code.
//!
//! [`IrqSpinLock`] is const-constructable so it can sit in `static` items
//! and is usable before any allocator or scheduler exists.

mod irq_spinlock;

pub(crate) mod loom_compat;

pub use irq_spinlock::{IrqSpinLock, IrqSpinLockGuard};
