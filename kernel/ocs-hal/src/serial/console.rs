//! Text output over the serial line: `fmt::Write` adapter and `log` sink.

use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use ocs_core::sync::IrqSpinLock;

/// A byte sink for console text.
pub trait Console: Sync {
    /// Writes one byte, translating `\n` as the sink requires.
    fn write_byte(&'static self, byte: u8);
}

/// `fmt::Write` over a [`Console`].
pub struct SerialWriter {
    console: &'static dyn Console,
}

impl SerialWriter {
    /// Creates a writer for `console`.
    #[must_use]
    pub const fn new(console: &'static dyn Console) -> Self {
        Self { console }
    }
}

impl Write for SerialWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.console.write_byte(byte);
        }
        Ok(())
    }
}

/// `log` backend that prints `[LEVEL] target: message` lines.
///
/// Records are dropped until a console is attached.
pub struct SerialLogger {
    console: IrqSpinLock<Option<&'static dyn Console>>,
}

impl SerialLogger {
    /// Creates a logger with no console.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            console: IrqSpinLock::new(None),
        }
    }

    /// Routes output to `console`.
    pub fn attach(&self, console: &'static dyn Console) {
        *self.console.lock() = Some(console);
    }

    /// Attaches `console`, registers `self` with `log` and sets the maximum
    /// level.
    ///
    /// # Errors
    ///
    /// Fails if another logger was registered first. The console is attached
    /// and the level applied either way.
    pub fn install(
        &'static self,
        console: &'static dyn Console,
        level: LevelFilter,
    ) -> Result<(), SetLoggerError> {
        self.attach(console);
        let result = log::set_logger(self);
        log::set_max_level(level);
        result
    }
}

impl Default for SerialLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let console = *self.console.lock();
        if let Some(console) = console {
            let _ = writeln!(
                SerialWriter::new(console),
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use ocs_test::leak;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<u8>>);

    impl Console for Recorder {
        fn write_byte(&'static self, byte: u8) {
            if byte == b'\n' {
                self.0.lock().unwrap().push(b'\r');
            }
            self.0.lock().unwrap().push(byte);
        }
    }

    #[test]
    fn writer_forwards_bytes() {
        let rec: &'static Recorder = leak(Recorder::default());
        write!(SerialWriter::new(rec), "eclock {}", 709_379).unwrap();
        assert_eq!(rec.0.lock().unwrap().as_slice(), b"eclock 709379");
    }

    #[test]
    fn logger_formats_records() {
        let rec: &'static Recorder = leak(Recorder::default());
        let logger = SerialLogger::new();
        log::set_max_level(LevelFilter::Trace);

        let emit = |logger: &SerialLogger| {
            logger.log(
                &Record::builder()
                    .level(log::Level::Info)
                    .target("clock")
                    .args(format_args!("E-clock {} Hz", 709_379))
                    .build(),
            );
        };
        emit(&logger);
        assert!(rec.0.lock().unwrap().is_empty());

        logger.attach(rec);
        emit(&logger);
        assert_eq!(
            rec.0.lock().unwrap().as_slice(),
            b"[INFO] clock: E-clock 709379 Hz\r\n"
        );
    }
}
