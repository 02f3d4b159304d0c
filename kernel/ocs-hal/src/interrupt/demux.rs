//! Flattening of Paula and CIA interrupt sources into logical vectors.

use core::sync::atomic::{AtomicU32, Ordering};

use ocs_core::sync::IrqSpinLock;
use ocs_hal_api::{HalError, IrqHandler, IrqReturn, Vector};
use ocs_mmio::RegisterBus;

use super::vector::{CIA_A_MUX, CIA_A_OFFSET, CIA_B_MUX, CIA_B_OFFSET, Line, level_mask};
use crate::regs::{CIA_A_BASE, CIA_B_BASE, CiaRegs, Icr, IntBits, PAULA_BASE, PaulaRegs};

/// Software copy of each CIA's ICR enable mask.
///
/// The ICR cannot be read back (reading returns and clears pending
/// sources), so this is the only record of which sources are enabled.
#[derive(Debug, Default, Clone, Copy)]
struct Shadow {
    cia_a: u8,
    cia_b: u8,
}

/// Dispatch counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InterruptStats {
    /// Dispatch passes run for a valid CPU level.
    pub dispatched: u32,
    /// Passes that reached no registered handler.
    pub spurious: u32,
}

/// Permission to perform the one destructive ICR read of a dispatch pass.
pub struct IcrLatch<'a, B: ?Sized> {
    regs: CiaRegs<'a, B>,
}

impl<'a, B: RegisterBus + ?Sized> IcrLatch<'a, B> {
    /// Creates the latch for `regs`.
    ///
    /// # Safety
    ///
    /// At most one latch per CIA may be sampled per interrupt, since the
    /// read clears every pending source.
    pub unsafe fn new(regs: CiaRegs<'a, B>) -> Self {
        Self { regs }
    }

    /// Reads and clears the ICR.
    pub fn sample(self) -> IcrSnapshot {
        // SAFETY: The latch is consumed, and `new`'s caller guarantees it is
        // the only one for this pass.
        IcrSnapshot(unsafe { self.regs.take_icr() })
    }
}

/// ICR contents captured by [`IcrLatch::sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcrSnapshot(Icr);

impl IcrSnapshot {
    /// Returns `true` if the CIA had an enabled source asserted.
    #[must_use]
    pub fn asserted(self) -> bool {
        self.0.contains(Icr::IR)
    }

    /// Pending sources, bit 0 to 4.
    #[must_use]
    pub fn sources(self) -> u8 {
        (self.0 & Icr::SOURCES).bits()
    }

    /// Pending sources that are also enabled in `shadow`, or zero if the CIA
    /// did not assert.
    #[must_use]
    pub fn qualified(self, shadow: u8) -> u8 {
        if self.asserted() {
            self.sources() & shadow
        } else {
            0
        }
    }
}

/// The interrupt demultiplexer.
///
/// Owns the handler table and the CIA enable shadows. One instance serves
/// the whole machine and lives for the lifetime of the kernel.
pub struct InterruptDemux<B: ?Sized + 'static> {
    bus: &'static B,
    handlers: IrqSpinLock<[Option<&'static dyn IrqHandler>; Vector::COUNT]>,
    shadow: IrqSpinLock<Shadow>,
    dispatched: AtomicU32,
    spurious: AtomicU32,
}

impl<B: RegisterBus + ?Sized> InterruptDemux<B> {
    /// Creates a demultiplexer with no handlers and every CIA source
    /// disabled.
    #[must_use]
    pub const fn new(bus: &'static B) -> Self {
        Self {
            bus,
            handlers: IrqSpinLock::new([None; Vector::COUNT]),
            shadow: IrqSpinLock::new(Shadow { cia_a: 0, cia_b: 0 }),
            dispatched: AtomicU32::new(0),
            spurious: AtomicU32::new(0),
        }
    }

    fn paula(&self) -> PaulaRegs<'static, B> {
        PaulaRegs::new(self.bus, PAULA_BASE)
    }

    fn cia_a(&self) -> CiaRegs<'static, B> {
        CiaRegs::new(self.bus, CIA_A_BASE)
    }

    fn cia_b(&self) -> CiaRegs<'static, B> {
        CiaRegs::new(self.bus, CIA_B_BASE)
    }

    /// Puts the interrupt hardware into a known state.
    ///
    /// Disables and clears every Paula line, disables every CIA source, then
    /// sets the master enable and opens the two CIA summary lines. Sources are
    /// enabled individually afterwards through [`unmask`](Self::unmask).
    pub fn early_init(&self) {
        let paula = self.paula();
        paula.set_intena(IntBits::ALL_LINES | IntBits::INTEN);
        paula.set_intreq(IntBits::ALL_LINES | IntBits::INTEN);

        {
            let mut shadow = self.shadow.lock();
            self.cia_a().set_icr(Icr::SOURCES);
            self.cia_b().set_icr(Icr::SOURCES);
            *shadow = Shadow::default();
        }

        paula.set_intena(IntBits::SET_CLR | IntBits::INTEN);
        self.enable(Vector::PORTS);
        self.enable(Vector::EXTER);
    }

    /// Disables `vector`.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidVector`] outside `1..=24`; nothing is
    /// written in that case.
    pub fn mask(&self, vector: u32) -> Result<(), HalError> {
        self.disable(Vector::new(vector)?);
        Ok(())
    }

    /// Enables `vector`.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidVector`] outside `1..=24`; nothing is
    /// written in that case.
    pub fn unmask(&self, vector: u32) -> Result<(), HalError> {
        self.enable(Vector::new(vector)?);
        Ok(())
    }

    /// Installs `handler` for `vector`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidVector`] outside `1..=24`; the table is left
    /// untouched in that case.
    pub fn register_handler(
        &self,
        vector: u32,
        handler: &'static dyn IrqHandler,
    ) -> Result<(), HalError> {
        self.install(Vector::new(vector)?, handler);
        Ok(())
    }

    /// Installs `handler` for an already validated vector.
    pub fn install(&self, vector: Vector, handler: &'static dyn IrqHandler) {
        self.handlers.lock()[vector.index()] = Some(handler);
    }

    /// Enables an already validated vector.
    pub fn enable(&self, vector: Vector) {
        self.set_enabled(vector, true);
    }

    /// Disables an already validated vector.
    pub fn disable(&self, vector: Vector) {
        self.set_enabled(vector, false);
    }

    fn set_enabled(&self, vector: Vector, on: bool) {
        let line = Line::of(vector);
        let bit = line.bit();
        match line {
            Line::Paula(_) => {
                let mut value = IntBits::from_bits_retain(1 << bit);
                value.set(IntBits::SET_CLR, on);
                self.paula().set_intena(value);
            }
            Line::CiaA(_) => self.set_cia_enabled(self.cia_a(), bit, on, |s| &mut s.cia_a),
            Line::CiaB(_) => self.set_cia_enabled(self.cia_b(), bit, on, |s| &mut s.cia_b),
        }
    }

    fn set_cia_enabled(
        &self,
        regs: CiaRegs<'static, B>,
        bit: u8,
        on: bool,
        select: impl FnOnce(&mut Shadow) -> &mut u8,
    ) {
        let mut shadow = self.shadow.lock();
        let mask = select(&mut *shadow);
        if on {
            *mask |= 1 << bit;
        } else {
            *mask &= !(1 << bit);
        }
        let mut value = Icr::from_bits_retain(1 << bit);
        value.set(Icr::IR, on);
        regs.set_icr(value);
    }

    /// Clears the pending request of a Paula line.
    ///
    /// CIA vectors need no acknowledge: the dispatch pass already consumed
    /// their ICR, so the call does nothing for them.
    pub fn acknowledge(&self, vector: Vector) {
        let line = Line::of(vector);
        if matches!(line, Line::Paula(_)) {
            self.paula().set_intreq(IntBits::from_bits_retain(1 << line.bit()));
        }
    }

    /// Services CPU interrupt `level` (1 to 6).
    ///
    /// Handlers run in ascending vector order. The result requests a
    /// reschedule if any handler did. Levels outside `1..=6` do nothing.
    pub fn dispatch(&self, level: u8) -> IrqReturn {
        let Some(level_lines) = level_mask(level) else {
            return IrqReturn::NoReschedule;
        };
        self.dispatched.fetch_add(1, Ordering::Relaxed);

        let paula = self.paula();
        let active = (paula.intreqr() & paula.intenar()).bits() & level_lines;
        let mut combined = u32::from(active & !(CIA_A_MUX | CIA_B_MUX));
        let mut to_clear = 0u16;

        let shadow = *self.shadow.lock();
        if active & CIA_A_MUX != 0 {
            // SAFETY: One CIA-A latch per pass.
            let snap = unsafe { IcrLatch::new(self.cia_a()) }.sample();
            combined |= u32::from(snap.qualified(shadow.cia_a)) << CIA_A_OFFSET;
            to_clear |= CIA_A_MUX;
        }
        if active & CIA_B_MUX != 0 {
            // SAFETY: One CIA-B latch per pass.
            let snap = unsafe { IcrLatch::new(self.cia_b()) }.sample();
            combined |= u32::from(snap.qualified(shadow.cia_b)) << CIA_B_OFFSET;
            to_clear |= CIA_B_MUX;
        }

        let mut ret = IrqReturn::NoReschedule;
        let mut delivered = false;
        while combined != 0 {
            let index = combined.trailing_zeros() as usize;
            combined &= combined - 1;

            let Some(vector) = Vector::from_index(index) else {
                continue;
            };
            let handler = self.handlers.lock()[index];
            if let Some(handler) = handler {
                ret |= handler.handle(vector);
                delivered = true;
            }
        }

        if !delivered {
            self.spurious.fetch_add(1, Ordering::Relaxed);
        }
        if to_clear != 0 {
            paula.set_intreq(IntBits::from_bits_retain(to_clear));
        }
        ret
    }

    /// Returns the dispatch counters.
    #[must_use]
    pub fn stats(&self) -> InterruptStats {
        InterruptStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            spurious: self.spurious.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocs_test::{MockBus, leak};

    const INTENA: usize = PAULA_BASE + 0x09A;
    const INTREQ: usize = PAULA_BASE + 0x09C;
    const CIA_A_ICR: usize = CIA_A_BASE + 0xD00;
    const CIA_B_ICR: usize = CIA_B_BASE + 0xD00;

    fn demux() -> (&'static MockBus, &'static InterruptDemux<MockBus>) {
        let bus = leak(MockBus::new());
        (bus, leak(InterruptDemux::new(bus)))
    }

    #[test]
    fn paula_lines_use_set_clr_protocol() {
        let (bus, demux) = demux();
        demux.unmask(12).unwrap();
        demux.mask(12).unwrap();
        demux.unmask(1).unwrap();
        assert_eq!(bus.writes_to(INTENA), vec![0x8800, 0x0800, 0x8001]);
    }

    #[test]
    fn cia_lines_update_shadow_and_icr() {
        let (bus, demux) = demux();
        demux.unmask(21).unwrap();
        demux.unmask(15).unwrap();
        demux.mask(21).unwrap();
        assert_eq!(bus.writes_to(CIA_B_ICR), vec![0x82, 0x02]);
        assert_eq!(bus.writes_to(CIA_A_ICR), vec![0x81]);
        let shadow = *demux.shadow.lock();
        assert_eq!(shadow.cia_a, 0x01);
        assert_eq!(shadow.cia_b, 0x00);
    }

    #[test]
    fn out_of_range_writes_nothing() {
        let (bus, demux) = demux();
        assert_eq!(demux.mask(0), Err(HalError::InvalidVector(0)));
        assert_eq!(demux.unmask(25), Err(HalError::InvalidVector(25)));
        let h: &'static dyn IrqHandler = leak(|_: Vector| IrqReturn::Reschedule);
        assert_eq!(
            demux.register_handler(99, h),
            Err(HalError::InvalidVector(99))
        );
        assert!(bus.writes().is_empty());
        assert!(demux.handlers.lock().iter().all(Option::is_none));
    }

    #[test]
    fn early_init_sequence() {
        let (bus, demux) = demux();
        demux.unmask(20).unwrap();
        bus.clear_log();

        demux.early_init();
        assert_eq!(bus.writes_to(INTENA), vec![0x7FFF, 0xC000, 0x8008, 0xA000]);
        assert_eq!(bus.writes_to(INTREQ), vec![0x7FFF]);
        assert_eq!(bus.writes_to(CIA_A_ICR), vec![0x1F]);
        assert_eq!(bus.writes_to(CIA_B_ICR), vec![0x1F]);
        assert_eq!(demux.shadow.lock().cia_b, 0);
    }

    #[test]
    fn acknowledge_only_touches_paula() {
        let (bus, demux) = demux();
        demux.acknowledge(Vector::RBF);
        demux.acknowledge(Vector::CIA_B_TB);
        assert_eq!(bus.writes_to(INTREQ), vec![0x0800]);
        assert_eq!(bus.writes().len(), 1);
    }

    #[test]
    fn invalid_level_dispatches_nothing() {
        let (bus, demux) = demux();
        assert_eq!(demux.dispatch(0), IrqReturn::NoReschedule);
        assert_eq!(demux.dispatch(7), IrqReturn::NoReschedule);
        assert_eq!(bus.reads_of(PAULA_BASE + 0x01E), 0);
        assert_eq!(demux.stats(), InterruptStats::default());
    }

    #[test]
    fn snapshot_qualification() {
        let snap = IcrSnapshot(Icr::IR | Icr::TA | Icr::TB);
        assert_eq!(snap.sources(), 0x03);
        assert_eq!(snap.qualified(0x02), 0x02);
        assert_eq!(IcrSnapshot(Icr::TB).qualified(0x1F), 0);
    }
}
