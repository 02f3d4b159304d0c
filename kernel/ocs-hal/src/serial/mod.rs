//! Paula UART driver.
//!
//! Transmit is queued: `put` enqueues and a kernel worker drains the queue
//! to `SERDAT`, woken by the TBE interrupt. With interrupts globally off the
//! worker cannot run, so `put` drains the queue itself by polling. Receive is
//! interrupt-driven into a small ring.

mod console;

pub use console::{Console, SerialLogger, SerialWriter};

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::{info, warn};
use ocs_core::sync::IrqSpinLock;
use ocs_hal_api::{Event, IrqHandler, IrqReturn, KernelServices, Vector, Worker};
use ocs_mmio::RegisterBus;
use planck_noalloc::ringbuf::RingBuf;

use crate::config::{RX_RING_SLOTS, SERIAL_BAUD, TX_RING_SLOTS};
use crate::interrupt::InterruptDemux;
use crate::regs::{PAULA_BASE, PaulaRegs, SERDAT_STOP_BIT, SerDatR};

/// Name of the transmit worker thread.
pub const TX_WORKER_NAME: &str = "uart-tx";

/// `SERPER` value for `baud` given the E-clock.
///
/// Paula's serial clock is the colour clock, five E-clock periods, and the
/// register holds the divisor minus one.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn serper_for(eclock_hz: u32, baud: u32) -> u16 {
    if baud == 0 {
        return 0x7FFF;
    }
    let colour_clock = eclock_hz as u64 * 5;
    let divisor = (colour_clock + baud as u64 / 2) / baud as u64;
    if divisor == 0 {
        0
    } else if divisor > 0x8000 {
        0x7FFF
    } else {
        (divisor - 1) as u16
    }
}

struct TxState<const N: usize> {
    queue: RingBuf<u8, N>,
    active: bool,
}

/// The serial driver.
///
/// `TX` and `RX` are ring slot counts; each ring holds one byte less.
pub struct Serial<
    B: ?Sized + 'static,
    K: KernelServices + 'static,
    const TX: usize = TX_RING_SLOTS,
    const RX: usize = RX_RING_SLOTS,
> {
    bus: &'static B,
    demux: &'static InterruptDemux<B>,
    kernel: &'static K,
    tx: IrqSpinLock<TxState<TX>>,
    rx: IrqSpinLock<RingBuf<u8, RX>>,
    tx_event: K::Event,
    rx_event: K::Event,
    worker_started: AtomicBool,
    rx_dropped: AtomicU32,
}

impl<B, K, const TX: usize, const RX: usize> Serial<B, K, TX, RX>
where
    B: RegisterBus + ?Sized,
    K: KernelServices,
{
    /// Creates the driver. Nothing touches hardware until [`init`](Self::init).
    pub fn new(bus: &'static B, demux: &'static InterruptDemux<B>, kernel: &'static K) -> Self {
        Self {
            bus,
            demux,
            kernel,
            tx: IrqSpinLock::new(TxState {
                queue: RingBuf::new(),
                active: false,
            }),
            rx: IrqSpinLock::new(RingBuf::new()),
            tx_event: kernel.create_event(),
            rx_event: kernel.create_event(),
            worker_started: AtomicBool::new(false),
            rx_dropped: AtomicU32::new(0),
        }
    }

    fn paula(&self) -> PaulaRegs<'static, B> {
        PaulaRegs::new(self.bus, PAULA_BASE)
    }

    /// Programs the line rate and enables receive interrupts.
    pub fn init(&'static self, eclock_hz: u32) {
        let period = serper_for(eclock_hz, SERIAL_BAUD);
        self.paula().set_serper(period);

        self.demux.install(Vector::TBE, self);
        self.demux.install(Vector::RBF, self);
        self.demux.enable(Vector::RBF);

        info!("serial: {SERIAL_BAUD} baud (SERPER {period})");
    }

    /// Queues `byte` for transmission.
    ///
    /// With interrupts disabled the queue and `byte` are written out
    /// synchronously. Otherwise the call blocks only while the queue is full.
    pub fn put(&'static self, byte: u8) {
        let irqs_disabled = self.kernel.interrupts_disabled();
        if !irqs_disabled {
            self.ensure_worker();
        }

        if irqs_disabled {
            self.put_polled(byte);
            return;
        }

        let mut tx = self.tx.lock();

        let mut queued = tx.queue.try_push(byte).is_ok();
        self.kick(&mut tx);
        while !queued {
            drop(tx);
            self.tx_event.signal();
            core::hint::spin_loop();
            tx = self.tx.lock();
            queued = tx.queue.try_push(byte).is_ok();
            if queued {
                self.kick(&mut tx);
            }
        }
    }

    /// Interrupts-off transmit. If the interrupted context holds the queue
    /// lock, the queue is left alone and only `byte` goes out.
    fn put_polled(&self, byte: u8) {
        let Some(mut tx) = self.tx.try_lock() else {
            self.transmit(byte);
            return;
        };
        self.drain_polled(&mut tx.queue);
        self.transmit(byte);
        self.drain_polled(&mut tx.queue);
        tx.active = false;
        self.demux.disable(Vector::TBE);
    }

    /// Writes `byte` even from a panic handler. Same path as [`put`](Self::put).
    pub fn panic_putc(&'static self, byte: u8) {
        self.put(byte);
    }

    /// Console output: `\n` goes out as `\r\n`.
    pub fn dputc(&'static self, byte: u8) {
        if byte == b'\n' {
            self.put(b'\r');
        }
        self.put(byte);
    }

    /// Pops a received byte. With `wait`, blocks until one arrives.
    pub fn get(&self, wait: bool) -> Option<u8> {
        loop {
            if let Some(byte) = self.rx.lock().pop() {
                return Some(byte);
            }
            if !wait {
                return None;
            }
            self.rx_event.wait();
        }
    }

    /// Polls the receiver once, bypassing the ring.
    pub fn panic_getc(&self) -> Option<u8> {
        let status = self.paula().serdatr();
        if status.contains(SerDatR::RBF) {
            self.demux.acknowledge(Vector::RBF);
            Some(status.data())
        } else {
            None
        }
    }

    /// Number of received bytes dropped because the ring was full.
    #[must_use]
    pub fn rx_dropped(&self) -> u32 {
        self.rx_dropped.load(Ordering::Relaxed)
    }

    fn ensure_worker(&'static self) {
        if self.worker_started.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(err) = self.kernel.spawn_worker(TX_WORKER_NAME, self) {
            warn!("serial: {err}, will retry");
            self.worker_started.store(false, Ordering::Release);
        }
    }

    /// Marks the transmitter busy and wakes the worker, if it was idle.
    fn kick(&self, tx: &mut TxState<TX>) {
        if !tx.active {
            tx.active = true;
            self.demux.enable(Vector::TBE);
            self.tx_event.signal();
        }
    }

    fn drain_polled(&self, queue: &mut RingBuf<u8, TX>) {
        while let Some(byte) = queue.pop() {
            self.transmit(byte);
        }
    }

    fn transmit(&self, byte: u8) {
        let paula = self.paula();
        while !paula.serdatr().contains(SerDatR::TBE) {
            core::hint::spin_loop();
        }
        paula.set_serdat(u16::from(byte) | SERDAT_STOP_BIT);
    }

    fn drain(&self) {
        loop {
            let byte = {
                let mut tx = self.tx.lock();
                if let Some(byte) = tx.queue.pop() {
                    tx.active = true;
                    byte
                } else {
                    tx.active = false;
                    self.demux.disable(Vector::TBE);
                    return;
                }
            };
            self.transmit(byte);
            self.demux.enable(Vector::TBE);
        }
    }

    fn tx_interrupt(&self) -> IrqReturn {
        self.demux.acknowledge(Vector::TBE);
        self.tx_event.signal();
        IrqReturn::NoReschedule
    }

    fn rx_interrupt(&self) -> IrqReturn {
        let status = self.paula().serdatr();
        self.demux.acknowledge(Vector::RBF);
        if !status.contains(SerDatR::RBF) {
            return IrqReturn::NoReschedule;
        }
        if self.rx.lock().try_push(status.data()).is_err() {
            self.rx_dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.rx_event.signal();
        IrqReturn::Reschedule
    }
}

impl<B, K, const TX: usize, const RX: usize> IrqHandler for Serial<B, K, TX, RX>
where
    B: RegisterBus + ?Sized,
    K: KernelServices,
{
    fn handle(&self, vector: Vector) -> IrqReturn {
        match vector {
            Vector::TBE => self.tx_interrupt(),
            Vector::RBF => self.rx_interrupt(),
            _ => IrqReturn::NoReschedule,
        }
    }
}

impl<B, K, const TX: usize, const RX: usize> Worker for Serial<B, K, TX, RX>
where
    B: RegisterBus + ?Sized,
    K: KernelServices,
{
    fn run(&self) {
        loop {
            self.tx_event.wait();
            self.drain();
        }
    }
}

impl<B, K, const TX: usize, const RX: usize> Console for Serial<B, K, TX, RX>
where
    B: RegisterBus + ?Sized,
    K: KernelServices,
{
    fn write_byte(&'static self, byte: u8) {
        self.dputc(byte);
    }
}
