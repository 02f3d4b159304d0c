//! Scriptable register bus.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use ocs_mmio::RegisterBus;

type ReadHook = Box<dyn FnMut() -> u32 + Send>;

/// One logged register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    /// Absolute address.
    pub addr: usize,
    /// Value written, zero-extended.
    pub value: u32,
}

#[derive(Default)]
struct State {
    values: HashMap<usize, u32>,
    scripted: HashMap<usize, VecDeque<u32>>,
    hooks: HashMap<usize, ReadHook>,
    writes: Vec<Access>,
    reads: HashMap<usize, usize>,
}

/// A [`RegisterBus`] backed by tables instead of hardware.
///
/// A read of `addr` returns, in order of preference: the next scripted
/// value, the result of its read hook, its preset value, or zero. Writes are
/// logged and never change what later reads return, since on this chipset
/// read and write ports are mostly distinct registers.
#[derive(Default)]
pub struct MockBus {
    state: Mutex<State>,
}

impl MockBus {
    /// Creates an empty bus where every register reads as zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Sets the value `addr` reads as once scripts and hooks are exhausted.
    pub fn set(&self, addr: usize, value: u32) {
        self.state().values.insert(addr, value);
    }

    /// Queues values returned by the next reads of `addr`, one per read.
    pub fn script(&self, addr: usize, values: impl IntoIterator<Item = u32>) {
        self.state()
            .scripted
            .entry(addr)
            .or_default()
            .extend(values);
    }

    /// Computes every unscripted read of `addr` with `hook`.
    pub fn on_read(&self, addr: usize, hook: impl FnMut() -> u32 + Send + 'static) {
        self.state().hooks.insert(addr, Box::new(hook));
    }

    /// Returns every write so far, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<Access> {
        self.state().writes.clone()
    }

    /// Returns the values written to `addr`, in order.
    #[must_use]
    pub fn writes_to(&self, addr: usize) -> Vec<u32> {
        self.state()
            .writes
            .iter()
            .filter(|a| a.addr == addr)
            .map(|a| a.value)
            .collect()
    }

    /// Returns how many times `addr` has been read.
    #[must_use]
    pub fn reads_of(&self, addr: usize) -> usize {
        self.state().reads.get(&addr).copied().unwrap_or(0)
    }

    /// Forgets logged writes and read counts. Presets, scripts and hooks stay.
    pub fn clear_log(&self) {
        let mut state = self.state();
        state.writes.clear();
        state.reads.clear();
    }

    fn read(&self, addr: usize) -> u32 {
        let mut state = self.state();
        *state.reads.entry(addr).or_insert(0) += 1;
        if let Some(v) = state.scripted.get_mut(&addr).and_then(VecDeque::pop_front) {
            return v;
        }
        if let Some(hook) = state.hooks.get_mut(&addr) {
            return hook();
        }
        state.values.get(&addr).copied().unwrap_or(0)
    }

    fn write(&self, addr: usize, value: u32) {
        self.state().writes.push(Access { addr, value });
    }
}

#[allow(clippy::cast_possible_truncation)]
impl RegisterBus for MockBus {
    fn read_u8(&self, addr: usize) -> u8 {
        self.read(addr) as u8
    }

    fn read_u16(&self, addr: usize) -> u16 {
        self.read(addr) as u16
    }

    fn read_u32(&self, addr: usize) -> u32 {
        self.read(addr)
    }

    fn write_u8(&self, addr: usize, value: u8) {
        self.write(addr, value.into());
    }

    fn write_u16(&self, addr: usize, value: u16) {
        self.write(addr, value.into());
    }

    fn write_u32(&self, addr: usize, value: u32) {
        self.write(addr, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_precedence() {
        let bus = MockBus::new();
        assert_eq!(bus.read_u16(0x10), 0);
        bus.set(0x10, 7);
        bus.script(0x10, [1, 2]);
        assert_eq!(bus.read_u16(0x10), 1);
        assert_eq!(bus.read_u16(0x10), 2);
        assert_eq!(bus.read_u16(0x10), 7);

        let mut n = 100;
        bus.on_read(0x10, move || {
            n += 1;
            n
        });
        assert_eq!(bus.read_u16(0x10), 101);
        assert_eq!(bus.read_u16(0x10), 102);
        assert_eq!(bus.reads_of(0x10), 6);
    }

    #[test]
    fn writes_are_logged_not_stored() {
        let bus = MockBus::new();
        bus.write_u8(0x20, 0x81);
        bus.write_u16(0x22, 0xC000);
        bus.write_u8(0x20, 0x01);
        assert_eq!(bus.read_u8(0x20), 0);
        assert_eq!(bus.writes_to(0x20), vec![0x81, 0x01]);
        assert_eq!(bus.writes().len(), 3);

        bus.clear_log();
        assert!(bus.writes().is_empty());
        assert_eq!(bus.reads_of(0x20), 0);
    }

    #[test]
    fn narrow_reads_truncate() {
        let bus = MockBus::new();
        bus.set(0x30, 0x1234);
        assert_eq!(bus.read_u8(0x30), 0x34);
    }
}
