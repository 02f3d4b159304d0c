//! CIA-B clock: monotonic time from Timer A, alarms from Timer B.

mod calibrate;

pub use calibrate::{
    Calibration, ClockSource, MAX_PLAUSIBLE_HZ, MIN_PLAUSIBLE_HZ, NTSC_NOMINAL_HZ,
    PAL_NOMINAL_HZ, calibrate, ms_to_ticks, select_frequency,
};

use core::sync::atomic::{AtomicU32, Ordering};

use log::{info, trace, warn};
use ocs_core::sync::IrqSpinLock;
use ocs_hal_api::{AlarmHandler, IrqHandler, IrqReturn, Vector};
use ocs_mmio::RegisterBus;

use crate::config::CALIBRATION_TRANSITIONS;
use crate::interrupt::InterruptDemux;
use crate::regs::{CIA_B_BASE, CiaRegs, Cra, Crb};

/// How an armed alarm repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmMode {
    /// Fire once; Timer B stops itself.
    OneShot,
    /// Fire every interval; Timer B reloads from its latch.
    Periodic,
}

#[derive(Clone, Copy)]
struct Alarm {
    handler: &'static dyn AlarmHandler,
    mode: AlarmMode,
    ticks: u16,
}

struct Timebase {
    last: u16,
    ticks: u64,
}

/// Timekeeping on CIA-B.
///
/// Timer A free-runs from `0xFFFF` and is folded into a 64-bit tick count
/// on every read; Timer B drives the single kernel alarm on vector 21.
pub struct CiaClock<B: ?Sized + 'static> {
    bus: &'static B,
    demux: &'static InterruptDemux<B>,
    hz: AtomicU32,
    timebase: IrqSpinLock<Timebase>,
    alarm: IrqSpinLock<Option<Alarm>>,
}

impl<B: RegisterBus + ?Sized> CiaClock<B> {
    /// Creates the clock. Until [`init`](Self::init) or
    /// [`start`](Self::start) runs it assumes the PAL nominal frequency.
    #[must_use]
    pub const fn new(bus: &'static B, demux: &'static InterruptDemux<B>) -> Self {
        Self {
            bus,
            demux,
            hz: AtomicU32::new(PAL_NOMINAL_HZ),
            timebase: IrqSpinLock::new(Timebase { last: 0, ticks: 0 }),
            alarm: IrqSpinLock::new(None),
        }
    }

    fn cia(&self) -> CiaRegs<'static, B> {
        CiaRegs::new(self.bus, CIA_B_BASE)
    }

    /// Calibrates the E-clock and starts timekeeping. Returns the frequency.
    ///
    /// Blocks for roughly 128 TOD periods (about 2.5 s).
    pub fn init(&'static self) -> u32 {
        let cal = calibrate(&self.cia(), CALIBRATION_TRANSITIONS);
        match cal.source {
            ClockSource::Fallback => warn!(
                "clock: calibration implausible ({} ticks), assuming {} Hz",
                cal.accumulated, cal.hz
            ),
            source => info!("clock: E-clock {} Hz ({source:?})", cal.hz),
        }
        self.start(cal.hz);
        cal.hz
    }

    /// Starts timekeeping at a known E-clock frequency.
    ///
    /// Restarts Timer A free-running, takes a new baseline sample, stops any
    /// alarm and installs the alarm handler on vector 21. Calling it again
    /// never moves monotonic time backwards.
    pub fn start(&'static self, hz: u32) {
        self.hz.store(hz.max(1), Ordering::Relaxed);
        self.demux.disable(Vector::CIA_B_TA);

        let cia = self.cia();
        cia.set_talo(0xFF);
        cia.set_tahi(0xFF);
        cia.set_cra(Cra::START);

        // A restart only moves the baseline; elapsed ticks are kept.
        self.timebase.lock().last = calibrate::sample_timer_a(&cia);

        self.stop_alarm();
        self.demux.install(Vector::CIA_B_TB, self);
    }

    /// Returns the E-clock frequency in use.
    #[must_use]
    pub fn frequency_hz(&self) -> u32 {
        self.hz.load(Ordering::Relaxed)
    }

    /// Returns monotonic time in microseconds.
    ///
    /// Must be called at least once per Timer A period (about 92 ms) or
    /// wraps are lost.
    #[allow(clippy::cast_possible_truncation)]
    pub fn now_micros(&self) -> u64 {
        let ticks = {
            let mut tb = self.timebase.lock();
            let now = calibrate::sample_timer_a(&self.cia());
            tb.ticks += u64::from(tb.last.wrapping_sub(now));
            tb.last = now;
            tb.ticks
        };
        (u128::from(ticks) * 1_000_000 / u128::from(self.frequency_hz())) as u64
    }

    /// Returns monotonic time in milliseconds.
    pub fn now_millis(&self) -> u64 {
        self.now_micros() / 1000
    }

    /// Fires `handler` once after `interval_ms`.
    pub fn arm_one_shot(&self, handler: &'static dyn AlarmHandler, interval_ms: u32) {
        self.arm(handler, interval_ms, AlarmMode::OneShot);
    }

    /// Fires `handler` every `interval_ms`.
    pub fn arm_periodic(&self, handler: &'static dyn AlarmHandler, interval_ms: u32) {
        self.arm(handler, interval_ms, AlarmMode::Periodic);
    }

    fn arm(&self, handler: &'static dyn AlarmHandler, interval_ms: u32, mode: AlarmMode) {
        let ticks = ms_to_ticks(interval_ms, self.frequency_hz());
        let mut alarm = self.alarm.lock();
        *alarm = Some(Alarm {
            handler,
            mode,
            ticks,
        });

        self.stop_alarm();
        let cia = self.cia();
        let [hi, lo] = ticks.to_be_bytes();
        cia.set_tblo(lo);
        cia.set_tbhi(hi);
        self.demux.enable(Vector::CIA_B_TB);

        let crb = match mode {
            AlarmMode::OneShot => Crb::LOAD | Crb::RUNMODE | Crb::START,
            AlarmMode::Periodic => Crb::LOAD | Crb::START,
        };
        cia.set_crb(crb);
        drop(alarm);

        trace!("clock: {mode:?} alarm in {interval_ms} ms ({ticks} ticks)");
    }

    /// Stops Timer B and masks the alarm vector.
    pub fn stop_alarm(&self) {
        self.cia().set_crb(Crb::empty());
        self.demux.disable(Vector::CIA_B_TB);
    }

    /// Returns the armed alarm's mode and tick count, if any.
    #[must_use]
    pub fn alarm(&self) -> Option<(AlarmMode, u16)> {
        self.alarm.lock().map(|a| (a.mode, a.ticks))
    }
}

impl<B: RegisterBus + ?Sized> IrqHandler for CiaClock<B> {
    fn handle(&self, _vector: Vector) -> IrqReturn {
        let alarm = *self.alarm.lock();
        match alarm {
            Some(alarm) => alarm.handler.expired(self.now_millis()),
            None => IrqReturn::NoReschedule,
        }
    }
}
