use checkinlib::config::DisplayConfig;
use checkinlib::outputs::compose;
use checkinlib::ssd1306::Ssd1306;
use embassy_executor::Spawner;
use esp_hal::i2c::master::I2c;
use esp_hal::Async;

use crate::SharedBoard;

type Display = Ssd1306<I2c<'static, Async>>;

pub fn setup_display(
    board: &'static SharedBoard,
    i2c: I2c<'static, Async>,
    config: &DisplayConfig,
    spawner: Spawner,
) {
    // The geometry was checked by `Config::validate`
    let display = Ssd1306::new(i2c, config).unwrap();
    spawner.must_spawn(display_task(board, display));
}

#[embassy_executor::task]
async fn display_task(board: &'static SharedBoard, mut display: Display) -> ! {
    let mut watcher = board.watch();

    if let Err(e) = display.configure().await {
        log::warn!("Failed to configure display: {e:?}");
    }

    loop {
        board.read(|board| compose(board, display.framebuffer_mut()));
        if let Err(e) = display.show().await {
            log::warn!("Dropped display frame: {e:?}");
        }

        watcher.changed().await;
    }
}
