//! Boot sequencing and the kernel-facing entry points.

use log::info;
use ocs_hal_api::{AlarmHandler, HalError, IrqHandler, IrqReturn, KernelServices};
use ocs_mmio::RegisterBus;

use crate::config::{MAX_LOG_LEVEL, SERIAL_BAUD};
use crate::interrupt::{InterruptDemux, InterruptStats, level_from_autovector};
use crate::serial::{Serial, SerialLogger};
use crate::timer::CiaClock;

static LOGGER: SerialLogger = SerialLogger::new();

/// The platform layer as one object.
///
/// The kernel allocates the three components for the lifetime of the
/// system, builds a `Platform` over them, calls [`boot`](Self::boot) once,
/// and afterwards reaches every service through these methods.
pub struct Platform<B: ?Sized + 'static, K: KernelServices + 'static> {
    demux: &'static InterruptDemux<B>,
    clock: &'static CiaClock<B>,
    serial: &'static Serial<B, K>,
}

impl<B: RegisterBus + ?Sized, K: KernelServices> Platform<B, K> {
    /// Bundles the platform components.
    #[must_use]
    pub const fn new(
        demux: &'static InterruptDemux<B>,
        clock: &'static CiaClock<B>,
        serial: &'static Serial<B, K>,
    ) -> Self {
        Self {
            demux,
            clock,
            serial,
        }
    }

    /// Brings the platform up: interrupts, then the clock, then serial and
    /// the serial logger. Returns the E-clock frequency.
    pub fn boot(&self) -> u32 {
        self.demux.early_init();
        let hz = self.clock.init();
        self.serial.init(hz);
        // A logger registered earlier by the kernel keeps precedence.
        if let Err(err) = LOGGER.install(self.serial, MAX_LOG_LEVEL) {
            info!("platform: keeping existing logger ({err})");
        }
        info!("platform: up, E-clock {hz} Hz, serial {SERIAL_BAUD} baud");
        hz
    }

    /// Disables a logical vector.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidVector`] outside `1..=24`.
    pub fn mask_vector(&self, vector: u32) -> Result<(), HalError> {
        self.demux.mask(vector)
    }

    /// Enables a logical vector.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidVector`] outside `1..=24`.
    pub fn unmask_vector(&self, vector: u32) -> Result<(), HalError> {
        self.demux.unmask(vector)
    }

    /// Installs an interrupt handler.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidVector`] outside `1..=24`.
    pub fn register_handler(
        &self,
        vector: u32,
        handler: &'static dyn IrqHandler,
    ) -> Result<(), HalError> {
        self.demux.register_handler(vector, handler)
    }

    /// Services CPU interrupt `level`.
    pub fn dispatch(&self, level: u8) -> IrqReturn {
        self.demux.dispatch(level)
    }

    /// Services the 68k autovector exception `vector` (25 to 30).
    pub fn dispatch_autovector(&self, vector: u8) -> IrqReturn {
        level_from_autovector(vector).map_or(IrqReturn::NoReschedule, |level| self.dispatch(level))
    }

    /// Returns the dispatch counters.
    #[must_use]
    pub fn interrupt_stats(&self) -> InterruptStats {
        self.demux.stats()
    }

    /// Monotonic time in microseconds.
    pub fn monotonic_micros(&self) -> u64 {
        self.clock.now_micros()
    }

    /// Monotonic time in milliseconds.
    pub fn monotonic_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Calibrated E-clock frequency.
    #[must_use]
    pub fn eclock_hz(&self) -> u32 {
        self.clock.frequency_hz()
    }

    /// Arms a one-shot alarm.
    pub fn arm_one_shot(&self, handler: &'static dyn AlarmHandler, interval_ms: u32) {
        self.clock.arm_one_shot(handler, interval_ms);
    }

    /// Arms a periodic alarm.
    pub fn arm_periodic(&self, handler: &'static dyn AlarmHandler, interval_ms: u32) {
        self.clock.arm_periodic(handler, interval_ms);
    }

    /// Cancels the alarm.
    pub fn stop_alarm(&self) {
        self.clock.stop_alarm();
    }

    /// Queues a byte for serial output.
    pub fn serial_put(&self, byte: u8) {
        self.serial.put(byte);
    }

    /// Reads a received byte, optionally blocking.
    pub fn serial_get(&self, wait: bool) -> Option<u8> {
        self.serial.get(wait)
    }

    /// Console output with newline translation.
    pub fn dputc(&self, byte: u8) {
        self.serial.dputc(byte);
    }

    /// Panic-safe output.
    pub fn panic_putc(&self, byte: u8) {
        self.serial.panic_putc(byte);
    }

    /// Panic-safe input, never blocks.
    pub fn panic_getc(&self) -> Option<u8> {
        self.serial.panic_getc()
    }
}
