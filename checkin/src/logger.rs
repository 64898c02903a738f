use esp_hal::time::Instant;
use esp_println::println;
use log::{Level, Log, Metadata, Record};

const MIN_LEVEL: Level = Level::Info;

/// Prints every record with the time since boot, nothing is kept.
pub struct UptimeLogger;

static LOGGER: UptimeLogger = UptimeLogger;

impl UptimeLogger {
    pub fn init() {
        // Safety: called once from `main` before any task is spawned.
        // We only call `set_logger` in this function so this is safe.
        unsafe {
            log::set_logger_racy(&LOGGER).unwrap();
            log::set_max_level_racy(MIN_LEVEL.to_level_filter());
        }
    }
}

impl Log for UptimeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= MIN_LEVEL
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let millis = Instant::now().duration_since_epoch().as_millis();
        let module_path = record.module_path().unwrap_or("???");
        println!(
            "[{:>6}.{:03}] [{}] {} - {}",
            millis / 1000,
            millis % 1000,
            record.level(),
            module_path,
            record.args()
        );
    }

    fn flush(&self) {}
}
