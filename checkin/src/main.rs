#![no_std]
#![no_main]

/// Allocate a value in a `StaticCell` and hand out the `'static` reference.
macro_rules! make_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.init($val)
    }};
}

mod display;
mod http;
mod leds;
mod logger;
mod responders;
mod wifi;

use core::panic::PanicInfo;

use build_time::build_time_local;
use checkinlib::config::Config;
use checkinlib::synchronizer::Synchronizer;
use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::Level::{High, Low};
use esp_hal::gpio::{Output, OutputConfig};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal_embassy::main;

use crate::display::setup_display;
use crate::http::setup_http_server;
use crate::leds::setup_leds;
use crate::logger::UptimeLogger;
use crate::wifi::setup_wifi;

esp_bootloader_esp_idf::esp_app_desc!();

/// The LED task and the display task.
pub const MAX_WATCHERS: usize = 2;

#[cfg(not(feature = "occupancy"))]
pub type ActiveBoard = checkinlib::board::PresenceBoard;
#[cfg(feature = "occupancy")]
pub type ActiveBoard = checkinlib::board::OccupancyBoard;

pub type SharedBoard = Synchronizer<MAX_WATCHERS, NoopRawMutex, ActiveBoard>;

#[main]
async fn main(spawner: Spawner) {
    // Hardware init
    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));
    esp_alloc::heap_allocator!(size: 72 * 1024);

    // Logging init
    UptimeLogger::init();
    log::info!(
        "Starting initialization of build {}...",
        build_time_local!("%Y-%m-%dT%H:%M:%S%.f%:z")
    );

    let config: &'static Config = make_static!(Config, Config::default());
    if let Err(e) = config.validate() {
        panic!("Invalid configuration: {e}");
    }

    // Setup embassy
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_hal_embassy::init(timg0.timer0);

    // Setup board, nobody is present at boot
    let board: &'static SharedBoard = make_static!(SharedBoard, Synchronizer::new(ActiveBoard::new()));

    // Setup leds
    let output_config = OutputConfig::default();
    let red = Output::new(peripherals.GPIO3, High, output_config);
    let green = Output::new(peripherals.GPIO4, Low, output_config);
    let blue = Output::new(peripherals.GPIO5, Low, output_config);
    setup_leds(board, red, green, blue, spawner);

    // Setup display
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .expect("i2c0 init")
    .with_sda(peripherals.GPIO8)
    .with_scl(peripherals.GPIO9)
    .into_async();
    setup_display(board, i2c, &config.display, spawner);

    // Setup http
    let stack = setup_wifi(
        &config.network,
        peripherals.SYSTIMER,
        peripherals.RNG,
        peripherals.WIFI,
        spawner,
    )
    .await;
    setup_http_server(stack, board, config.network.http_port, spawner);

    log::info!("Running...")
}

#[panic_handler]
fn panic_handler(info: &PanicInfo) -> ! {
    esp_println::println!("PANIC: {info}");

    // Safety: nothing else runs after a panic, so taking the indicator pins cannot race.
    let (red, green) = unsafe {
        (
            esp_hal::peripherals::GPIO3::steal(),
            esp_hal::peripherals::GPIO4::steal(),
        )
    };
    let _red = Output::new(red, High, OutputConfig::default());
    let _green = Output::new(green, Low, OutputConfig::default());

    loop {}
}
