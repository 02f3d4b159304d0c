//! Vector to hardware line mapping.

use ocs_hal_api::Vector;

/// Number of Paula source lines (vectors 1 to 14).
pub const PAULA_LINES: u32 = 14;
/// Number of sources per CIA.
pub const CIA_LINES: u32 = 5;
/// Bit offset of CIA-A sources in the combined pending word.
pub const CIA_A_OFFSET: u32 = PAULA_LINES;
/// Bit offset of CIA-B sources in the combined pending word.
pub const CIA_B_OFFSET: u32 = PAULA_LINES + CIA_LINES;

/// Paula bit that summarizes CIA-A (`PORTS`, vector 4).
pub const CIA_A_MUX: u16 = 1 << 3;
/// Paula bit that summarizes CIA-B (`EXTER`, vector 14).
pub const CIA_B_MUX: u16 = 1 << 13;

/// Paula lines routed to each CPU level, index 0 being level 1.
///
/// The sets are pairwise disjoint and together cover all 14 lines.
pub const LEVEL_MASKS: [u16; 6] = [
    0x0007, // 1: TBE, DSKBLK, SOFT
    0x0008, // 2: PORTS
    0x0070, // 3: COPER, VERTB, BLIT
    0x0780, // 4: AUD0-3
    0x1800, // 5: RBF, DSKSYN
    0x2000, // 6: EXTER
];

/// 68k autovector number of CPU level 1.
const AUTOVECTOR_BASE: u8 = 24;

/// Returns the Paula lines for CPU `level`, or `None` outside `1..=6`.
#[must_use]
pub const fn level_mask(level: u8) -> Option<u16> {
    match level {
        1..=6 => Some(LEVEL_MASKS[(level - 1) as usize]),
        _ => None,
    }
}

/// Converts a 68k exception vector number (25 to 30) to its CPU level.
#[must_use]
pub const fn level_from_autovector(vector: u8) -> Option<u8> {
    match vector.checked_sub(AUTOVECTOR_BASE) {
        Some(level @ 1..=6) => Some(level),
        _ => None,
    }
}

/// Hardware source behind a logical vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// Paula line, bit 0 to 13 of `INTENA`/`INTREQ`.
    Paula(u8),
    /// CIA-A source, bit 0 to 4 of its ICR.
    CiaA(u8),
    /// CIA-B source, bit 0 to 4 of its ICR.
    CiaB(u8),
}

impl Line {
    /// Resolves `vector` to its hardware line.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn of(vector: Vector) -> Self {
        let n = vector.number();
        if n <= PAULA_LINES {
            Self::Paula((n - 1) as u8)
        } else if n <= CIA_B_OFFSET {
            Self::CiaA((n - CIA_A_OFFSET - 1) as u8)
        } else {
            Self::CiaB((n - CIA_B_OFFSET - 1) as u8)
        }
    }

    /// Bit position of the line within its own register.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::Paula(b) | Self::CiaA(b) | Self::CiaB(b) => b,
        }
    }
}
