//! Interrupt-safe spin lock.
//!
//! Raises the 68k interrupt priority mask before acquiring the inner
//! spinlock and restores the previous status register on release. This
//! prevents deadlocks when a lock is shared between interrupt handlers and
//! normal kernel code on the single execution unit.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

use super::loom_compat::{AtomicBool, Ordering, spin_hint};

/// A spin lock that masks interrupts while held.
pub struct IrqSpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: Atomic ops on `locked` ensure exclusive access to `data`.
unsafe impl<T: Send> Send for IrqSpinLock<T> {}
unsafe impl<T: Send> Sync for IrqSpinLock<T> {}

impl<T> IrqSpinLock<T> {
    /// Creates a new unlocked `IrqSpinLock`.
    #[cfg(not(loom))]
    pub const fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Creates a new unlocked `IrqSpinLock`.
    #[cfg(loom)]
    pub fn new(value: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires the lock, masking interrupts first.
    pub fn lock(&self) -> IrqSpinLockGuard<'_, T> {
        let saved = save_and_disable();

        // TTAS spin to acquire.
        loop {
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return IrqSpinLockGuard {
                    lock: self,
                    saved,
                    _not_send: PhantomData,
                };
            }
            while self.locked.load(Ordering::Relaxed) {
                spin_hint();
            }
        }
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// Useful on panic paths where blocking on a lock held by the
    /// interrupted context would never return.
    pub fn try_lock(&self) -> Option<IrqSpinLockGuard<'_, T>> {
        let saved = save_and_disable();
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(IrqSpinLockGuard {
                lock: self,
                saved,
                _not_send: PhantomData,
            })
        } else {
            restore(saved);
            None
        }
    }
}

/// RAII guard that restores interrupt state on drop.
///
/// Not `Send`: the saved status register belongs to the context that took
/// the lock.
pub struct IrqSpinLockGuard<'a, T> {
    lock: &'a IrqSpinLock<T>,
    saved: u16,
    _not_send: PhantomData<*const ()>,
}

// SAFETY: Sharing a guard only hands out `&T`, which is fine when `T: Sync`.
unsafe impl<T: Sync> Sync for IrqSpinLockGuard<'_, T> {}

impl<T> Deref for IrqSpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: The lock is held, so we have exclusive access to the data.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for IrqSpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: The lock is held, so we have exclusive access to the data.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for IrqSpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
        restore(self.saved);
    }
}

/// Saves the status register and raises the interrupt mask to level 7.
#[cfg(all(target_os = "none", target_arch = "m68k"))]
#[inline]
fn save_and_disable() -> u16 {
    let sr: u16;
    // SAFETY: The kernel runs in supervisor mode; raising the IPL only
    // masks interrupts and touches no memory.
    unsafe {
        core::arch::asm!(
            "move.w %sr, {sr}",
            "ori.w #0x0700, %sr",
            sr = out(reg_data) sr,
            options(nomem, nostack),
        );
    }
    sr
}

/// Restores a status register saved by [`save_and_disable`].
#[cfg(all(target_os = "none", target_arch = "m68k"))]
#[inline]
fn restore(sr: u16) {
    // SAFETY: Writing back a previously saved SR only restores the IPL and
    // condition codes of the same context.
    unsafe {
        core::arch::asm!(
            "move.w {sr}, %sr",
            sr = in(reg_data) sr,
            options(nomem, nostack),
        );
    }
}

#[cfg(not(all(target_os = "none", target_arch = "m68k")))]
#[inline]
fn save_and_disable() -> u16 {
    0
}

#[cfg(not(all(target_os = "none", target_arch = "m68k")))]
#[inline]
fn restore(_sr: u16) {}
