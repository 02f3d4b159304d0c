//! Interrupt vectors and handler contracts.

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

use crate::error::HalError;

/// A logical interrupt vector in `1..=24`.
///
/// Vectors 1 to 14 are the chipset's own lines, 15 to 19 are CIA-A sources
/// and 20 to 24 are CIA-B sources. A `Vector` can only be obtained through
/// validation, so every value is in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vector(u8);

impl Vector {
    /// Lowest valid vector number.
    pub const MIN: u32 = 1;
    /// Highest valid vector number.
    pub const MAX: u32 = 24;
    /// Number of logical vectors.
    pub const COUNT: usize = 24;

    /// Serial transmit buffer empty.
    pub const TBE: Self = Self(1);
    /// CIA-A summary line (level 2).
    pub const PORTS: Self = Self(4);
    /// Serial receive buffer full.
    pub const RBF: Self = Self(12);
    /// CIA-B summary line (level 6).
    pub const EXTER: Self = Self(14);
    /// CIA-A Timer A underflow.
    pub const CIA_A_TA: Self = Self(15);
    /// CIA-B Timer A underflow.
    pub const CIA_B_TA: Self = Self(20);
    /// CIA-B Timer B underflow, used as the system alarm.
    pub const CIA_B_TB: Self = Self(21);

    /// Validates a raw vector number.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidVector`] if `n` is outside `1..=24`.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(n: u32) -> Result<Self, HalError> {
        if n >= Self::MIN && n <= Self::MAX {
            Ok(Self(n as u8))
        } else {
            Err(HalError::InvalidVector(n))
        }
    }

    /// Returns the vector number.
    #[must_use]
    pub const fn number(self) -> u32 {
        self.0 as u32
    }

    /// Returns the dense table index (`n - 1`).
    #[must_use]
    pub const fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Returns the vector for a dense table index, if in range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(index as u8 + 1))
        } else {
            None
        }
    }

    /// Iterates over every valid vector in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).filter_map(Self::from_index)
    }
}

impl TryFrom<u32> for Vector {
    type Error = HalError;

    fn try_from(n: u32) -> Result<Self, HalError> {
        Self::new(n)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vec{}", self.0)
    }
}

/// Whether an interrupt handler wants the scheduler to run on return.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// Return to the interrupted context.
    #[default]
    NoReschedule,
    /// A thread was woken; reschedule before returning.
    Reschedule,
}

impl IrqReturn {
    /// Returns `true` for [`IrqReturn::Reschedule`].
    #[must_use]
    pub const fn is_reschedule(self) -> bool {
        matches!(self, Self::Reschedule)
    }
}

impl From<bool> for IrqReturn {
    fn from(reschedule: bool) -> Self {
        if reschedule {
            Self::Reschedule
        } else {
            Self::NoReschedule
        }
    }
}

impl BitOr for IrqReturn {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::from(self.is_reschedule() || rhs.is_reschedule())
    }
}

impl BitOrAssign for IrqReturn {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// A handler for one or more logical vectors.
///
/// Runs in interrupt context: it must not block, and it must not take a lock
/// that non-interrupt code holds without masking interrupts.
pub trait IrqHandler: Sync {
    /// Services `vector`.
    fn handle(&self, vector: Vector) -> IrqReturn;
}

impl<F> IrqHandler for F
where
    F: Fn(Vector) -> IrqReturn + Sync,
{
    fn handle(&self, vector: Vector) -> IrqReturn {
        self(vector)
    }
}

/// Callback invoked when a programmed alarm expires.
pub trait AlarmHandler: Sync {
    /// Called from interrupt context with the current monotonic time in
    /// milliseconds.
    fn expired(&self, now_ms: u64) -> IrqReturn;
}

impl<F> AlarmHandler for F
where
    F: Fn(u64) -> IrqReturn + Sync,
{
    fn expired(&self, now_ms: u64) -> IrqReturn {
        self(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_full_range() {
        for n in 1..=24 {
            let v = Vector::new(n).unwrap();
            assert_eq!(v.number(), n);
            assert_eq!(v.index() as u32, n - 1);
        }
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(Vector::new(0), Err(HalError::InvalidVector(0)));
        assert_eq!(Vector::new(25), Err(HalError::InvalidVector(25)));
        assert_eq!(
            Vector::try_from(u32::MAX),
            Err(HalError::InvalidVector(u32::MAX))
        );
    }

    #[test]
    fn index_round_trips() {
        assert_eq!(Vector::from_index(20), Some(Vector::CIA_B_TB));
        assert_eq!(Vector::from_index(24), None);
        assert_eq!(Vector::all().count(), 24);
        assert!(Vector::all().is_sorted());
    }

    #[test]
    fn reschedule_aggregates_as_or() {
        use IrqReturn::{NoReschedule, Reschedule};
        assert_eq!(NoReschedule | NoReschedule, NoReschedule);
        assert_eq!(NoReschedule | Reschedule, Reschedule);
        assert_eq!(Reschedule | NoReschedule, Reschedule);

        let mut acc = IrqReturn::default();
        acc |= Reschedule;
        acc |= NoReschedule;
        assert!(acc.is_reschedule());
    }

    #[test]
    fn closures_are_handlers() {
        let irq = |v: Vector| IrqReturn::from(v == Vector::RBF);
        assert!(irq.handle(Vector::RBF).is_reschedule());
        assert!(!irq.handle(Vector::TBE).is_reschedule());

        let alarm = |now: u64| IrqReturn::from(now > 10);
        assert!(alarm.expired(11).is_reschedule());
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Vector::EXTER), "vec14");
    }
}
