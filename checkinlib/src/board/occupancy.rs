//! Occupancy board: a head count per floor and the floor currently being looked at.

use core::fmt;
use core::fmt::Write;

use super::{Board, Outcome, Timestamp};
use crate::query;
use crate::ssd1306::{Framebuffer, PAGE_HEIGHT};

pub const FLOOR_COUNT: usize = 5;
pub const MAX_OCCUPANCY: u8 = 50;

const FLOOR_PARAM_LEN: usize = 4;
const ACTION_PARAM_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
    Clear,
}

impl Action {
    pub fn parse(value: &str) -> Option<Self> {
        [
            ("add", Action::Add),
            ("remove", Action::Remove),
            ("clear", Action::Clear),
        ]
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|(_, action)| action)
    }
}

#[derive(Debug, Default)]
pub struct OccupancyBoard {
    counts: [u8; FLOOR_COUNT],
    selected: usize,
}

impl OccupancyBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> &[u8; FLOOR_COUNT] {
        &self.counts
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().map(|c| *c as u32).sum()
    }

    /// Floor number from a query value. Anything that does not parse counts as floor 0.
    pub fn parse_floor(value: &str) -> usize {
        value.parse().unwrap_or(0)
    }

    pub fn select(&mut self, floor: usize) -> Outcome {
        if floor >= FLOOR_COUNT || floor == self.selected {
            return Outcome::Unchanged;
        }
        self.selected = floor;
        Outcome::Changed
    }

    /// Apply `action` to `floor` and make it the selected floor.
    pub fn act(&mut self, floor: usize, action: Action) -> Outcome {
        let Some(count) = self.counts.get(floor).copied() else {
            return Outcome::Unchanged;
        };
        let selection = self.select(floor);
        let updated = match action {
            Action::Add => count.saturating_add(1).min(MAX_OCCUPANCY),
            Action::Remove => count.saturating_sub(1),
            Action::Clear => 0,
        };
        self.counts[floor] = updated;
        log::info!("Floor {floor}: {action:?} -> {updated}");

        if updated != count {
            Outcome::Changed
        } else {
            selection
        }
    }
}

impl Board for OccupancyBoard {
    const KEYS: &'static [&'static str] = &["floor=", "action="];
    const EXTRA_HEADERS: &'static str = "Cache-Control: no-store\r\n";

    fn apply(&mut self, line: &str, _now: Timestamp) -> Outcome {
        let floor = query::extract(line, "floor", FLOOR_PARAM_LEN).map(Self::parse_floor);
        let action = query::extract(line, "action", ACTION_PARAM_LEN);

        let target = floor.unwrap_or(self.selected);
        if target >= FLOOR_COUNT {
            log::debug!("Ignoring unknown floor {target}");
            return Outcome::Unchanged;
        }

        match action.and_then(Action::parse) {
            Some(action) => self.act(target, action),
            None => self.select(target),
        }
    }

    fn occupied(&self) -> bool {
        self.counts[self.selected] > 0
    }

    fn render_page<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        out.write_str(
            "<!DOCTYPE html><html>\
             <head><meta charset=\"UTF-8\"><title>Occupancy</title></head>\
             <body><h2>Building occupancy</h2>",
        )?;
        write!(
            out,
            "<p>People in the building: {}</p><p>Floor {}: {} of {}</p>",
            self.total(),
            self.selected,
            self.counts[self.selected],
            MAX_OCCUPANCY
        )?;

        out.write_str("<form action=\"/\" method=\"GET\"><select name=\"floor\">")?;
        for floor in 0..FLOOR_COUNT {
            let selected = if floor == self.selected { " selected" } else { "" };
            write!(out, "<option value=\"{floor}\"{selected}>Floor {floor}</option>")?;
        }
        out.write_str(
            "</select>\
             <button name=\"action\" value=\"add\">Add</button>\
             <button name=\"action\" value=\"remove\">Remove</button>\
             <button name=\"action\" value=\"clear\">Clear</button>\
             </form>\
             <table><tr><th>Floor</th><th>People</th></tr>",
        )?;
        for (floor, count) in self.counts.iter().enumerate() {
            if floor == self.selected {
                write!(out, "<tr class=\"selected\"><td><b>{floor}</b></td><td><b>{count}</b></td></tr>")?;
            } else {
                write!(out, "<tr><td>{floor}</td><td>{count}</td></tr>")?;
            }
        }
        out.write_str("</table></body></html>\r\n")
    }

    fn draw(&self, fb: &mut Framebuffer) {
        let mut line = heapless::String::<16>::new();
        let _ = write!(
            line,
            "FLOOR {} COUNT {}",
            self.selected, self.counts[self.selected]
        );
        fb.draw_str(0, 0, &line);

        for (floor, count) in self.counts.iter().enumerate() {
            line.clear();
            let marker = if floor == self.selected { " SEL" } else { "" };
            let _ = write!(line, "F{floor} {count}{marker}");
            fb.draw_str(0, ((floor + 2) * PAGE_HEIGHT) as u32, &line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssd1306::font::Glyph;
    use proptest::prelude::*;

    const NOW: Timestamp = Timestamp::from_secs(0);

    #[test]
    fn add_on_floor_selects_it() {
        let mut board = OccupancyBoard::new();
        assert_eq!(
            board.apply("GET /?floor=2&action=add HTTP/1.1", NOW),
            Outcome::Changed
        );
        assert_eq!(board.counts(), &[0, 0, 1, 0, 0]);
        assert_eq!(board.selected(), 2);
        assert!(board.occupied());
    }

    #[test]
    fn add_is_clamped() {
        let mut board = OccupancyBoard::new();
        for _ in 0..51 {
            board.apply("GET /?floor=2&action=add HTTP/1.1", NOW);
        }
        assert_eq!(board.counts()[2], MAX_OCCUPANCY);
        assert_eq!(
            board.apply("GET /?floor=2&action=add HTTP/1.1", NOW),
            Outcome::Unchanged
        );
    }

    #[test]
    fn remove_never_goes_negative() {
        let mut board = OccupancyBoard::new();
        board.apply("GET /?floor=1&action=add HTTP/1.1", NOW);
        board.apply("GET /?floor=1&action=remove HTTP/1.1", NOW);
        assert_eq!(
            board.apply("GET /?floor=1&action=remove HTTP/1.1", NOW),
            Outcome::Unchanged
        );
        assert_eq!(board.counts()[1], 0);
    }

    #[test]
    fn action_without_floor_targets_selection() {
        let mut board = OccupancyBoard::new();
        board.apply("GET /?floor=3 HTTP/1.1", NOW);
        assert_eq!(board.selected(), 3);
        board.apply("GET /?action=add HTTP/1.1", NOW);
        board.apply("GET /?action=ADD HTTP/1.1", NOW);
        assert_eq!(board.counts()[3], 2);
        board.apply("GET /?action=clear HTTP/1.1", NOW);
        assert_eq!(board.counts()[3], 0);
    }

    #[test]
    fn out_of_range_floor_is_a_no_op() {
        let mut board = OccupancyBoard::new();
        board.apply("GET /?floor=1 HTTP/1.1", NOW);
        assert_eq!(
            board.apply("GET /?floor=9&action=add HTTP/1.1", NOW),
            Outcome::Unchanged
        );
        assert_eq!(board.counts(), &[0; FLOOR_COUNT]);
        assert_eq!(board.selected(), 1);
    }

    #[test]
    fn unparseable_floor_means_floor_zero() {
        let mut board = OccupancyBoard::new();
        board.apply("GET /?floor=4 HTTP/1.1", NOW);
        board.apply("GET /?floor=abc&action=add HTTP/1.1", NOW);
        board.apply("GET /?floor=-1&action=add HTTP/1.1", NOW);
        assert_eq!(board.counts()[0], 2);
        assert_eq!(board.selected(), 0);
    }

    #[test]
    fn unknown_action_only_selects() {
        let mut board = OccupancyBoard::new();
        assert_eq!(
            board.apply("GET /?floor=4&action=jump HTTP/1.1", NOW),
            Outcome::Changed
        );
        assert_eq!(board.selected(), 4);
        assert_eq!(board.counts(), &[0; FLOOR_COUNT]);
    }

    #[test]
    fn page_marks_selected_floor() {
        let mut board = OccupancyBoard::new();
        board.apply("GET /?floor=2&action=add HTTP/1.1", NOW);
        let mut html = String::new();
        board.render_page(&mut html).unwrap();
        assert!(html.contains("<p>People in the building: 1</p>"));
        assert!(html.contains("<option value=\"2\" selected>Floor 2</option>"));
        assert!(html.contains("<tr class=\"selected\"><td><b>2</b></td><td><b>1</b></td></tr>"));
        assert!(html.contains("<tr><td>0</td><td>0</td></tr>"));
        assert_eq!(html.matches("<tr").count(), FLOOR_COUNT + 1);
    }

    #[test]
    fn draw_shows_status_and_table() {
        let mut board = OccupancyBoard::new();
        board.apply("GET /?floor=1&action=add HTTP/1.1", NOW);
        let mut fb = Framebuffer::new(128, 64).unwrap();
        board.draw(&mut fb);

        assert_eq!(&fb.as_bytes()[1..9], Glyph::from_char('F').columns());
        // "F1 1 SEL" on page 3, the 'S' is the sixth character.
        let s = 1 + 3 * 128 + 5 * 8;
        assert_eq!(&fb.as_bytes()[s..s + 8], Glyph::from_char('S').columns());
        // Floor 4 on page 6 has no marker.
        let blank = 1 + 6 * 128 + 5 * 8;
        assert!(fb.as_bytes()[blank..blank + 24].iter().all(|b| *b == 0));
    }

    proptest! {
        #[test]
        fn counters_stay_in_range(ops in proptest::collection::vec((0usize..7, 0u8..4), 0..200)) {
            let mut board = OccupancyBoard::new();
            for (floor, op) in ops {
                let action = ["add", "remove", "clear", "noop"][op as usize];
                let line = format!("GET /?floor={floor}&action={action} HTTP/1.1");
                board.apply(&line, NOW);
                prop_assert!(board.selected() < FLOOR_COUNT);
                prop_assert!(board.counts().iter().all(|c| *c <= MAX_OCCUPANCY));
            }
        }
    }
}
