//! SSD1306 OLED driver over I2C.
//!
//! The panel is addressed in pages of 8 vertical pixels. Every bus transfer starts with a
//! control byte telling the controller whether the rest is a command or pixel data.

pub mod font;
mod framebuffer;

pub use framebuffer::{DisplayError, Framebuffer, RenderArea};

use embedded_hal_async::i2c::I2c;

use crate::config::DisplayConfig;

pub const PAGE_HEIGHT: usize = 8;
pub const MAX_WIDTH: usize = 128;
pub const MAX_HEIGHT: usize = 64;
/// Largest framebuffer including its control byte.
pub const FRAMEBUFFER_CAPACITY: usize = MAX_HEIGHT / PAGE_HEIGHT * MAX_WIDTH + 1;

pub const CONTROL_CMD: u8 = 0x80;
pub const CONTROL_DATA: u8 = 0x40;

/// SSD1306 commands
pub mod cmd {
    pub const SET_MEM_MODE: u8 = 0x20;
    pub const SET_COL_ADDR: u8 = 0x21;
    pub const SET_PAGE_ADDR: u8 = 0x22;
    pub const SET_HORIZ_SCROLL: u8 = 0x26;
    pub const SET_SCROLL: u8 = 0x2E;
    pub const SET_DISP_START_LINE: u8 = 0x40;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const SET_SEG_REMAP: u8 = 0xA0;
    pub const SET_ENTIRE_ON: u8 = 0xA4;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_DISP: u8 = 0xAE;
    pub const SET_COM_OUT_DIR: u8 = 0xC0;
    pub const SET_DISP_OFFSET: u8 = 0xD3;
    pub const SET_DISP_CLK_DIV: u8 = 0xD5;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_COM_PIN_CFG: u8 = 0xDA;
    pub const SET_VCOM_DESEL: u8 = 0xDB;
}

/// Length of the power-up sequence sent by [`Ssd1306::configure`] before the display-on command.
pub const CONFIG_SEQUENCE_LEN: usize = 21;

pub struct Ssd1306<I2C> {
    i2c: I2C,
    address: u8,
    flip: bool,
    framebuffer: Framebuffer,
}

impl<I2C: I2c> Ssd1306<I2C> {
    pub fn new(i2c: I2C, config: &DisplayConfig) -> Result<Self, DisplayError> {
        Ok(Self {
            i2c,
            address: config.address,
            flip: config.flip,
            framebuffer: Framebuffer::new(config.width, config.height)?,
        })
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Power-up command list. Order matters, the controller interprets arguments positionally.
    pub fn config_sequence(&self) -> [u8; CONFIG_SEQUENCE_LEN] {
        let height = self.framebuffer.height();
        let (remap, com_dir) = if self.flip { (0x01, 0x08) } else { (0x00, 0x00) };
        [
            cmd::SET_DISP, // off
            cmd::SET_MEM_MODE,
            0x00, // horizontal addressing
            cmd::SET_DISP_START_LINE,
            cmd::SET_SEG_REMAP | remap,
            cmd::SET_MUX_RATIO,
            height - 1,
            cmd::SET_COM_OUT_DIR | com_dir,
            cmd::SET_DISP_OFFSET,
            0x00,
            cmd::SET_COM_PIN_CFG,
            if height == 32 { 0x02 } else { 0x12 },
            cmd::SET_DISP_CLK_DIV,
            0x80,
            cmd::SET_PRECHARGE,
            0xF1,
            cmd::SET_VCOM_DESEL,
            0x30,
            cmd::SET_CONTRAST,
            0xFF,
            cmd::SET_ENTIRE_ON, // follow RAM
        ]
    }

    /// Send the power-up sequence and switch the panel on.
    pub async fn configure(&mut self) -> Result<(), I2C::Error> {
        let sequence = self.config_sequence();
        self.commands(&sequence).await?;
        self.command(cmd::SET_DISP | 0x01).await
    }

    /// Send a single command byte.
    pub async fn command(&mut self, cmd: u8) -> Result<(), I2C::Error> {
        self.i2c.write(self.address, &[CONTROL_CMD, cmd]).await
    }

    /// Send each byte as its own command transfer.
    pub async fn commands(&mut self, cmds: &[u8]) -> Result<(), I2C::Error> {
        for &c in cmds {
            self.command(c).await?;
        }
        Ok(())
    }

    /// Transfer the whole framebuffer.
    pub async fn show(&mut self) -> Result<(), I2C::Error> {
        let area = self.framebuffer.full_area();
        self.render(&area).await
    }

    /// Point the controller at `area` and transfer its pixels in one data transfer.
    /// Areas outside the panel are skipped.
    pub async fn render(&mut self, area: &RenderArea) -> Result<(), I2C::Error> {
        if !self.framebuffer.contains(area) {
            log::warn!("Skipping render of area {area:?} outside the panel");
            return Ok(());
        }

        self.commands(&[
            cmd::SET_COL_ADDR,
            area.start_col,
            area.end_col,
            cmd::SET_PAGE_ADDR,
            area.start_page,
            area.end_page,
        ])
        .await?;

        if *area == self.framebuffer.full_area() {
            return self.i2c.write(self.address, self.framebuffer.as_bytes()).await;
        }

        let mut data = [0u8; FRAMEBUFFER_CAPACITY];
        data[0] = CONTROL_DATA;
        let len = self.framebuffer.copy_area(area, &mut data[1..]);
        self.i2c.write(self.address, &data[..len + 1]).await
    }

    /// Start or stop continuous horizontal scrolling over pages 0 to 3.
    pub async fn scroll(&mut self, on: bool) -> Result<(), I2C::Error> {
        self.commands(&[
            cmd::SET_HORIZ_SCROLL,
            0x00, // dummy
            0x00, // start page
            0x00, // time interval
            0x03, // end page
            0x00, // dummy
            0xFF, // dummy
            cmd::SET_SCROLL | on as u8,
        ])
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embedded_hal_async::i2c::{ErrorKind, ErrorType, Operation};
    use std::vec::Vec;

    /// Records every write transfer as (address, bytes).
    #[derive(Default)]
    struct RecordingBus {
        writes: Vec<(u8, Vec<u8>)>,
        fail: bool,
    }

    impl ErrorType for RecordingBus {
        type Error = ErrorKind;
    }

    impl I2c for RecordingBus {
        async fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            for op in operations {
                if let Operation::Write(bytes) = op {
                    self.writes.push((address, bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    fn display(width: u8, height: u8) -> Ssd1306<RecordingBus> {
        let config = DisplayConfig {
            width,
            height,
            ..DisplayConfig::default()
        };
        Ssd1306::new(RecordingBus::default(), &config).unwrap()
    }

    fn sent_commands(bus: &RecordingBus) -> Vec<u8> {
        bus.writes
            .iter()
            .filter(|(_, bytes)| bytes[0] == CONTROL_CMD)
            .map(|(_, bytes)| {
                assert_eq!(bytes.len(), 2);
                bytes[1]
            })
            .collect()
    }

    #[test]
    fn configure_sends_exact_sequence() {
        let mut display = display(128, 64);
        block_on(display.configure()).unwrap();
        let bus = display.release();

        assert!(bus.writes.iter().all(|(addr, _)| *addr == 0x3C));
        assert_eq!(
            sent_commands(&bus),
            [
                0xAE, 0x20, 0x00, 0x40, 0xA1, 0xA8, 0x3F, 0xC8, 0xD3, 0x00, 0xDA, 0x12, 0xD5,
                0x80, 0xD9, 0xF1, 0xDB, 0x30, 0x81, 0xFF, 0xA4, 0xAF
            ]
        );
    }

    #[test]
    fn configure_for_short_unflipped_panel() {
        let config = DisplayConfig {
            height: 32,
            flip: false,
            address: 0x3D,
            ..DisplayConfig::default()
        };
        let mut display = Ssd1306::new(RecordingBus::default(), &config).unwrap();
        block_on(display.configure()).unwrap();
        let bus = display.release();

        let cmds = sent_commands(&bus);
        assert_eq!(cmds[4], 0xA0);
        assert_eq!(cmds[6], 31);
        assert_eq!(cmds[7], 0xC0);
        assert_eq!(cmds[11], 0x02);
        assert!(bus.writes.iter().all(|(addr, _)| *addr == 0x3D));
    }

    #[test]
    fn show_addresses_full_panel_then_sends_buffer() {
        let mut display = display(128, 64);
        display.framebuffer_mut().draw_str(0, 0, "HI");
        block_on(display.show()).unwrap();
        let expected = display.framebuffer().as_bytes().to_vec();
        let bus = display.release();

        assert_eq!(sent_commands(&bus), [0x21, 0, 127, 0x22, 0, 7]);
        let (_, data) = bus.writes.last().unwrap();
        assert_eq!(data.len(), 1025);
        assert_eq!(data[0], CONTROL_DATA);
        assert_eq!(data, &expected);
    }

    #[test]
    fn render_sub_area_gathers_pixels() {
        let mut display = display(128, 32);
        display.framebuffer_mut().draw_char(8, 8, 'A');
        let area = RenderArea::new(8, 15, 1, 2);
        block_on(display.render(&area)).unwrap();
        let bus = display.release();

        assert_eq!(sent_commands(&bus), [0x21, 8, 15, 0x22, 1, 2]);
        let (_, data) = bus.writes.last().unwrap();
        assert_eq!(data.len(), area.buflen() + 1);
        assert_eq!(&data[1..9], font::Glyph::from_char('A').columns());
        assert!(data[9..].iter().all(|b| *b == 0));
    }

    #[test]
    fn render_outside_panel_sends_nothing() {
        let mut display = display(128, 32);
        block_on(display.render(&RenderArea::new(0, 127, 0, 4))).unwrap();
        assert!(display.release().writes.is_empty());
    }

    #[test]
    fn clear_does_not_transmit() {
        let mut display = display(128, 64);
        display.framebuffer_mut().clear();
        assert!(display.release().writes.is_empty());
    }

    #[test]
    fn scroll_sequence() {
        let mut display = display(128, 64);
        block_on(display.scroll(true)).unwrap();
        block_on(display.scroll(false)).unwrap();
        let cmds = sent_commands(&display.release());
        assert_eq!(
            cmds,
            [
                0x26, 0, 0, 0, 0x03, 0, 0xFF, 0x2F, 0x26, 0, 0, 0, 0x03, 0, 0xFF, 0x2E
            ]
        );
    }

    #[test]
    fn bus_errors_are_propagated() {
        let mut display = display(128, 64);
        display.i2c.fail = true;
        assert_eq!(block_on(display.show()), Err(ErrorKind::Other));
    }
}
