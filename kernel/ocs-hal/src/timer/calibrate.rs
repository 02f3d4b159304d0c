//! E-clock calibration.
//!
//! The CIA timers tick at the E-clock, which differs between PAL and NTSC
//! machines and is not discoverable from software. The TOD counter is
//! clocked by the mains-derived vertical sync instead, so counting Timer A
//! ticks across a fixed number of TOD transitions gives the E-clock once
//! the mains frequency is guessed. Both guesses are computed and the one
//! that lands on a plausible E-clock wins.

use ocs_mmio::RegisterBus;

use crate::regs::{CiaRegs, Cra, Icr};

/// Nominal PAL E-clock.
pub const PAL_NOMINAL_HZ: u32 = 709_379;
/// Nominal NTSC E-clock.
pub const NTSC_NOMINAL_HZ: u32 = 715_909;
/// Lowest plausible E-clock.
pub const MIN_PLAUSIBLE_HZ: u32 = 650_000;
/// Highest plausible E-clock.
pub const MAX_PLAUSIBLE_HZ: u32 = 780_000;

/// Where a calibrated frequency came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    /// 50 Hz TOD reference.
    Pal,
    /// 60 Hz TOD reference.
    Ntsc,
    /// No candidate was plausible; the PAL nominal is used.
    Fallback,
}

/// Result of a calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    /// Selected E-clock frequency.
    pub hz: u32,
    /// Which candidate was selected.
    pub source: ClockSource,
    /// Timer A ticks counted.
    pub accumulated: u64,
}

/// Picks the E-clock from `accumulated` Timer A ticks over `transitions`
/// TOD transitions.
#[must_use]
pub fn select_frequency(accumulated: u64, transitions: u32) -> (u32, ClockSource) {
    let transitions = u64::from(transitions.max(1));
    let pal = u32::try_from(accumulated.saturating_mul(50) / transitions).ok();
    let ntsc = u32::try_from(accumulated.saturating_mul(60) / transitions).ok();

    let plausible =
        |hz: Option<u32>| hz.filter(|hz| (MIN_PLAUSIBLE_HZ..=MAX_PLAUSIBLE_HZ).contains(hz));

    match (plausible(pal), plausible(ntsc)) {
        (Some(pal), Some(ntsc)) => {
            if pal.abs_diff(PAL_NOMINAL_HZ) <= ntsc.abs_diff(NTSC_NOMINAL_HZ) {
                (pal, ClockSource::Pal)
            } else {
                (ntsc, ClockSource::Ntsc)
            }
        }
        (Some(pal), None) => (pal, ClockSource::Pal),
        (None, Some(ntsc)) => (ntsc, ClockSource::Ntsc),
        (None, None) => (PAL_NOMINAL_HZ, ClockSource::Fallback),
    }
}

/// Converts `ms` to timer ticks at `hz`, rounded and clamped to `1..=65535`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn ms_to_ticks(ms: u32, hz: u32) -> u16 {
    let ticks = (ms as u64 * hz as u64 + 500) / 1000;
    if ticks == 0 {
        1
    } else if ticks > u16::MAX as u64 {
        u16::MAX
    } else {
        ticks as u16
    }
}

/// Tick count past which the TOD reference is considered stalled.
///
/// Twice what the fastest plausible clock would accumulate, so a working
/// reference always finishes first.
const fn stall_ceiling(transitions: u32) -> u64 {
    2 * MAX_PLAUSIBLE_HZ as u64 * transitions as u64 / 50
}

/// Reads Timer A as one 16-bit value.
///
/// The two bytes are read separately while the counter runs. If the high
/// byte changed between two reads the low byte is re-read so both halves
/// belong to the same count.
pub(super) fn sample_timer_a<B: RegisterBus + ?Sized>(cia: &CiaRegs<'_, B>) -> u16 {
    let mut lo = cia.talo();
    let hi1 = cia.tahi();
    let hi2 = cia.tahi();
    if hi1 != hi2 {
        lo = cia.talo();
    }
    u16::from_be_bytes([hi2, lo])
}

/// Measures the E-clock against the TOD counter.
///
/// Busy-waits for `transitions` TOD changes with Timer A free-running from
/// `0xFFFF`. Leaves Timer A running.
pub fn calibrate<B: RegisterBus + ?Sized>(cia: &CiaRegs<'_, B>, transitions: u32) -> Calibration {
    cia.set_cra(Cra::empty());
    cia.set_tahi(0xFF);
    cia.set_talo(0xFF);
    cia.set_icr(Icr::TA);
    cia.set_cra(Cra::START);

    let ceiling = stall_ceiling(transitions);
    let mut seen = 0;
    let mut accumulated: u64 = 0;
    let mut last_ta = sample_timer_a(cia);
    let mut last_tod = cia.todmid();

    while seen < transitions && accumulated <= ceiling {
        let now = sample_timer_a(cia);
        accumulated += u64::from(last_ta.wrapping_sub(now));
        last_ta = now;

        let tod = cia.todmid();
        if tod != last_tod {
            seen += 1;
            last_tod = tod;
        }
    }

    let (hz, source) = select_frequency(accumulated, transitions);
    Calibration {
        hz,
        source,
        accumulated,
    }
}
