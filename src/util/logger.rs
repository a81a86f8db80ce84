//! Minimal `log::Log` sink for the bare-metal target. There is no terminal
//! driver in this build; the sink is a hook the platform init routine points
//! at whatever console the board provides.

use log::{Level, Metadata, Record};

struct FirmwareLogger;

static LOGGER: FirmwareLogger = FirmwareLogger;

impl log::Log for FirmwareLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        crate::arch::console_write_fmt(format_args!(
            "[{:<5} {}] {}\n",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

pub fn logger_init() -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(log::LevelFilter::Info))
}
