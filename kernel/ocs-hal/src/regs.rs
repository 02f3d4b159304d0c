//! Chipset register maps.
//!
//! Paula is a block of 16-bit registers at `0xDFF000`. The two CIAs are
//! 8-bit devices that decode one register per 256 bytes; CIA-A sits on the
//! odd byte lane, CIA-B on the even one.

use bitflags::bitflags;
use ocs_mmio::register_block;

/// Paula custom chip base address.
pub const PAULA_BASE: usize = 0xDF_F000;
/// CIA-A base address (odd byte lane).
pub const CIA_A_BASE: usize = 0xBF_E001;
/// CIA-B base address (even byte lane).
pub const CIA_B_BASE: usize = 0xBF_D000;

/// Stop bit OR'd into every `SERDAT` write (8N1 framing).
pub const SERDAT_STOP_BIT: u16 = 0x200;

bitflags! {
    /// `INTENA`/`INTREQ` line bits.
    ///
    /// Writes use bit 15 as the operation selector: set means "set the
    /// listed bits", clear means "clear them".
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IntBits: u16 {
        /// Serial transmit buffer empty.
        const TBE = 1 << 0;
        /// Disk block finished.
        const DSKBLK = 1 << 1;
        /// Software interrupt.
        const SOFT = 1 << 2;
        /// CIA-A and expansion (level 2).
        const PORTS = 1 << 3;
        /// Copper.
        const COPER = 1 << 4;
        /// Vertical blank.
        const VERTB = 1 << 5;
        /// Blitter finished.
        const BLIT = 1 << 6;
        /// Audio channel 0.
        const AUD0 = 1 << 7;
        /// Audio channel 1.
        const AUD1 = 1 << 8;
        /// Audio channel 2.
        const AUD2 = 1 << 9;
        /// Audio channel 3.
        const AUD3 = 1 << 10;
        /// Serial receive buffer full.
        const RBF = 1 << 11;
        /// Disk sync found.
        const DSKSYN = 1 << 12;
        /// CIA-B and expansion (level 6).
        const EXTER = 1 << 13;
        /// Master interrupt enable (`INTENA` only).
        const INTEN = 1 << 14;
        /// Set/clear selector.
        const SET_CLR = 1 << 15;

        /// Every source line.
        const ALL_LINES = 0x3FFF;
    }
}

bitflags! {
    /// CIA interrupt control register.
    ///
    /// Reading returns pending sources plus [`Icr::IR`] and clears them all.
    /// Writing updates the enable mask, bit 7 selecting set or clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Icr: u8 {
        /// Timer A underflow.
        const TA = 1 << 0;
        /// Timer B underflow.
        const TB = 1 << 1;
        /// TOD alarm.
        const ALRM = 1 << 2;
        /// Serial port buffer full/empty.
        const SP = 1 << 3;
        /// FLAG pin.
        const FLG = 1 << 4;
        /// Read: an enabled source is pending. Write: set/clear selector.
        const IR = 1 << 7;

        /// Every source bit.
        const SOURCES = 0x1F;
    }
}

bitflags! {
    /// CIA control register A.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Cra: u8 {
        /// Start the timer.
        const START = 1 << 0;
        /// Timer output on PB6.
        const PBON = 1 << 1;
        /// Toggle output mode.
        const OUTMODE = 1 << 2;
        /// One-shot mode.
        const RUNMODE = 1 << 3;
        /// Force load from latch (strobe).
        const LOAD = 1 << 4;
        /// Count CNT pulses.
        const INMODE = 1 << 5;
        /// Serial port output.
        const SPMODE = 1 << 6;
    }
}

bitflags! {
    /// CIA control register B.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Crb: u8 {
        /// Start the timer.
        const START = 1 << 0;
        /// Timer output on PB7.
        const PBON = 1 << 1;
        /// Toggle output mode.
        const OUTMODE = 1 << 2;
        /// One-shot mode.
        const RUNMODE = 1 << 3;
        /// Force load from latch (strobe).
        const LOAD = 1 << 4;
        /// Input mode select, low bit.
        const INMODE0 = 1 << 5;
        /// Input mode select, high bit.
        const INMODE1 = 1 << 6;
        /// TOD writes set the alarm.
        const ALARM = 1 << 7;
    }
}

bitflags! {
    /// `SERDATR`: serial status in the high byte, received data in the low.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SerDatR: u16 {
        /// First stop bit.
        const STP = 1 << 9;
        /// Current state of the RXD pin.
        const RXD = 1 << 11;
        /// Shift register empty.
        const TSRE = 1 << 12;
        /// Transmit buffer empty.
        const TBE = 1 << 13;
        /// Receive buffer full.
        const RBF = 1 << 14;
        /// Receiver overrun.
        const OVRUN = 1 << 15;
    }
}

impl SerDatR {
    /// Received data byte.
    #[must_use]
    pub const fn data(self) -> u8 {
        self.bits().to_le_bytes()[0]
    }
}

register_block! {
    /// Paula interrupt and serial registers.
    pub PaulaRegs {
        /// Serial data and status.
        [0x018; u16; ro] serdatr => SerDatR,
        /// Interrupt enable read-back.
        [0x01C; u16; ro] intenar => IntBits,
        /// Interrupt request read-back.
        [0x01E; u16; ro] intreqr => IntBits,
        /// Serial transmit data, stop bits included.
        [0x030; u16; wo] serdat,
        /// Serial period (baud divisor).
        [0x032; u16; wo] serper,
        /// Interrupt enable, set/clear by bit 15.
        [0x09A; u16; wo] intena => IntBits,
        /// Interrupt request, set/clear by bit 15.
        [0x09C; u16; wo] intreq => IntBits,
    }
}

register_block! {
    /// 8520 CIA timer, TOD and interrupt registers.
    pub CiaRegs {
        /// Timer A low byte.
        [0x400; u8; rw] talo,
        /// Timer A high byte.
        [0x500; u8; rw] tahi,
        /// Timer B low byte.
        [0x600; u8; rw] tblo,
        /// Timer B high byte.
        [0x700; u8; rw] tbhi,
        /// Time-of-day counter, bits 0-7.
        [0x800; u8; ro] todlo,
        /// Time-of-day counter, bits 8-15.
        [0x900; u8; ro] todmid,
        /// Time-of-day counter, bits 16-23.
        [0xA00; u8; ro] todhi,
        /// Interrupt control; reading acknowledges every source.
        [0xD00; u8; rc] icr => Icr,
        /// Control register A.
        [0xE00; u8; rw] cra => Cra,
        /// Control register B.
        [0xF00; u8; rw] crb => Crb,
    }
}
