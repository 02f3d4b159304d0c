//! Kernel service contracts.
//!
//! The platform layer never touches the scheduler directly. It asks the
//! kernel for events and worker threads through [`KernelServices`], which the
//! kernel implements once and hands over as a `&'static` reference.

use crate::error::HalError;

/// An auto-reset wakeup event.
///
/// `signal` may be called from interrupt context. A signal delivered while
/// nobody waits is remembered until the next `wait`, which consumes it.
pub trait Event: Send + Sync {
    /// Wakes one waiter, or arms the event if none is waiting.
    fn signal(&self);

    /// Blocks until the event is signalled, then resets it.
    fn wait(&self);
}

/// A long-running body executed on a kernel thread.
pub trait Worker: Sync {
    /// Runs the worker. Implementations normally never return.
    fn run(&self);
}

/// Services the kernel provides to the platform layer.
pub trait KernelServices: Sync {
    /// Event type produced by [`create_event`](Self::create_event).
    type Event: Event;

    /// Creates a new, unsignalled auto-reset event.
    fn create_event(&self) -> Self::Event;

    /// Returns `true` while interrupts are globally disabled (panic, early
    /// boot). Blocking is not allowed in that state.
    fn interrupts_disabled(&self) -> bool;

    /// Starts `worker` on a new kernel thread named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::SpawnFailed`] if the thread could not be created.
    fn spawn_worker(&self, name: &'static str, worker: &'static dyn Worker)
    -> Result<(), HalError>;
}
