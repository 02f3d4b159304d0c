//! Kernel services on std threads.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread;

use ocs_hal_api::{Event, HalError, KernelServices, Worker};

/// Auto-reset event built on a mutex and condition variable.
#[derive(Default)]
pub struct HostEvent {
    signalled: Mutex<bool>,
    cond: Condvar,
    signals: AtomicUsize,
}

impl HostEvent {
    /// Creates an unsignalled event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times the event has been signalled.
    #[must_use]
    pub fn signal_count(&self) -> usize {
        self.signals.load(Ordering::SeqCst)
    }

    /// Returns `true` if a signal is pending.
    #[must_use]
    pub fn is_signalled(&self) -> bool {
        *self.signalled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Event for HostEvent {
    fn signal(&self) {
        self.signals.fetch_add(1, Ordering::SeqCst);
        let mut flag = self.signalled.lock().unwrap_or_else(PoisonError::into_inner);
        *flag = true;
        self.cond.notify_one();
    }

    fn wait(&self) {
        let mut flag = self.signalled.lock().unwrap_or_else(PoisonError::into_inner);
        while !*flag {
            flag = self.cond.wait(flag).unwrap_or_else(PoisonError::into_inner);
        }
        *flag = false;
    }
}

/// Kernel services for host tests.
///
/// Workers run on std threads. In deferred mode spawned workers are parked
/// until [`start_deferred_workers`](Self::start_deferred_workers), which lets
/// a test fill queues while no consumer runs.
#[derive(Default)]
pub struct HostKernel {
    interrupts_disabled: AtomicBool,
    deferred: bool,
    parked: Mutex<Vec<(&'static str, &'static dyn Worker)>>,
    spawned: AtomicUsize,
    failures: AtomicUsize,
}

impl HostKernel {
    /// Creates a kernel that starts workers immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a kernel that parks workers until released.
    #[must_use]
    pub fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }

    /// Simulates global interrupt masking.
    pub fn set_interrupts_disabled(&self, disabled: bool) {
        self.interrupts_disabled.store(disabled, Ordering::SeqCst);
    }

    /// Makes the next `n` spawn requests fail.
    pub fn fail_next_spawns(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Returns how many workers were accepted (started or parked).
    #[must_use]
    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Starts every parked worker.
    pub fn start_deferred_workers(&self) {
        let parked: Vec<_> = self
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for (name, worker) in parked {
            let _ = start(name, worker);
        }
    }
}

fn start(name: &'static str, worker: &'static dyn Worker) -> Result<(), HalError> {
    thread::Builder::new()
        .name(name.into())
        .spawn(move || worker.run())
        .map(drop)
        .map_err(|_| HalError::SpawnFailed(name))
}

impl KernelServices for HostKernel {
    type Event = HostEvent;

    fn create_event(&self) -> HostEvent {
        HostEvent::new()
    }

    fn interrupts_disabled(&self) -> bool {
        self.interrupts_disabled.load(Ordering::SeqCst)
    }

    fn spawn_worker(
        &self,
        name: &'static str,
        worker: &'static dyn Worker,
    ) -> Result<(), HalError> {
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(HalError::SpawnFailed(name));
        }
        if self.deferred {
            self.parked
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((name, worker));
        } else {
            start(name, worker)?;
        }
        self.spawned.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{leak, wait_until};

    #[test]
    fn event_remembers_early_signal() {
        let ev = HostEvent::new();
        ev.signal();
        assert!(ev.is_signalled());
        ev.wait();
        assert!(!ev.is_signalled());
        assert_eq!(ev.signal_count(), 1);
    }

    #[test]
    fn event_wakes_waiter() {
        let ev: &'static HostEvent = leak(HostEvent::new());
        let waiter = thread::spawn(move || ev.wait());
        ev.signal();
        waiter.join().unwrap();
    }

    struct Flag(AtomicBool);

    impl Worker for Flag {
        fn run(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn deferred_workers_wait_for_release() {
        let kernel = HostKernel::deferred();
        let flag: &'static Flag = leak(Flag(AtomicBool::new(false)));
        kernel.spawn_worker("flag", flag).unwrap();
        assert_eq!(kernel.spawn_count(), 1);
        thread::sleep(std::time::Duration::from_millis(20));
        assert!(!flag.0.load(Ordering::SeqCst));

        kernel.start_deferred_workers();
        assert!(wait_until(|| flag.0.load(Ordering::SeqCst)));
    }

    #[test]
    fn injected_spawn_failures() {
        let kernel = HostKernel::new();
        let flag: &'static Flag = leak(Flag(AtomicBool::new(false)));
        kernel.fail_next_spawns(1);
        assert_eq!(
            kernel.spawn_worker("flag", flag),
            Err(HalError::SpawnFailed("flag"))
        );
        assert_eq!(kernel.spawn_count(), 0);
        kernel.spawn_worker("flag", flag).unwrap();
        assert!(wait_until(|| flag.0.load(Ordering::SeqCst)));
    }
}
