use checkinlib::outputs::{indicator, Indicator};
use embassy_executor::Spawner;
use esp_hal::gpio::Output;

use crate::SharedBoard;

pub fn setup_leds(
    board: &'static SharedBoard,
    red: Output<'static>,
    green: Output<'static>,
    blue: Output<'static>,
    spawner: Spawner,
) {
    spawner.must_spawn(led_task(board, red, green, blue));
}

#[embassy_executor::task]
async fn led_task(
    board: &'static SharedBoard,
    mut red: Output<'static>,
    mut green: Output<'static>,
    mut blue: Output<'static>,
) -> ! {
    let mut watcher = board.watch();
    let mut shown: Option<Indicator> = None;

    loop {
        let current = board.read(indicator);
        if shown != Some(current) {
            let levels = current.levels();
            red.set_level(levels.red.into());
            green.set_level(levels.green.into());
            blue.set_level(levels.blue.into());
            shown = Some(current);
            log::info!("Indicator set to {current:?}");
        }

        watcher.changed().await;
    }
}
