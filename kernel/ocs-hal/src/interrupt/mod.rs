//! Interrupt demultiplexing.
//!
//! The 68k sees six autovectored levels. Paula folds its 14 sources onto
//! those levels, and each CIA folds its five sources onto a single Paula
//! line. This module flattens that tree into 24 logical vectors.

mod demux;
mod vector;

pub use demux::{IcrLatch, IcrSnapshot, InterruptDemux, InterruptStats};
pub use vector::{
    CIA_A_MUX, CIA_A_OFFSET, CIA_B_MUX, CIA_B_OFFSET, CIA_LINES, LEVEL_MASKS, Line, PAULA_LINES,
    level_from_autovector, level_mask,
};
