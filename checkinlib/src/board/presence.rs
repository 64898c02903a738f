//! Check-in board: who is in the building, plus a log of arrivals and departures.

use core::fmt;

use super::{Board, History, Outcome, Timestamp};
use crate::query;
use crate::ssd1306::{Framebuffer, PAGE_HEIGHT};

/// Users that can check in, matched case-insensitively.
pub const USERS: [&str; 4] = ["JOAO", "MARIA", "CARLOS", "VISITANTE"];

/// Longest `user` value that is compared against [`USERS`].
pub const USER_PARAM_LEN: usize = 15;

/// History records shown on the page.
pub const RECENT_ENTRIES: usize = 5;

#[derive(Default)]
pub struct PresenceBoard {
    present: [bool; USERS.len()],
    history: History,
}

impl PresenceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_index(name: &str) -> Option<usize> {
        USERS.iter().position(|user| user.eq_ignore_ascii_case(name))
    }

    pub fn is_present(&self, name: &str) -> bool {
        Self::user_index(name).is_some_and(|i| self.present[i])
    }

    pub fn present_count(&self) -> usize {
        self.present.iter().filter(|p| **p).count()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Check `name` in if absent, out if present. Unknown names are ignored.
    pub fn toggle(&mut self, name: &str, now: Timestamp) -> Outcome {
        let Some(index) = Self::user_index(name) else {
            log::debug!("Ignoring unknown user {name:?}");
            return Outcome::Unchanged;
        };

        let user = USERS[index];
        let present = !self.present[index];
        self.present[index] = present;
        let transition = if present { "checked in" } else { "checked out" };
        self.history.push(format_args!("{user} {transition} at {now}"));
        log::info!("{user} {transition} at {now}");
        Outcome::Changed
    }

    /// Mark everybody absent and forget the history.
    pub fn clear(&mut self) -> Outcome {
        self.present = [false; USERS.len()];
        self.history.clear();
        log::info!("Presence history cleared");
        Outcome::Changed
    }
}

impl Board for PresenceBoard {
    const KEYS: &'static [&'static str] = &["user=", "clear="];

    fn apply(&mut self, line: &str, now: Timestamp) -> Outcome {
        if query::contains(line, "clear=true") {
            return self.clear();
        }
        match query::extract(line, "user", USER_PARAM_LEN) {
            Some(user) => self.toggle(user, now),
            None => Outcome::Unchanged,
        }
    }

    fn occupied(&self) -> bool {
        self.present.iter().any(|p| *p)
    }

    fn render_page<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        out.write_str(
            "<!DOCTYPE html><html>\
             <head><meta charset=\"UTF-8\"><title>Check-in</title></head>\
             <body><h2>Attendance</h2>",
        )?;
        write!(out, "<p>People present: {}</p>", self.present_count())?;

        out.write_str("<form action=\"/\" method=\"GET\">")?;
        for user in USERS {
            write!(out, "<button name=\"user\" value=\"{user}\">")?;
            write_capitalized(out, user)?;
            out.write_str("</button>")?;
        }
        out.write_str(
            "</form>\
             <form action=\"/\" method=\"GET\">\
             <button name=\"clear\" value=\"true\">Clear history</button>\
             </form>\
             <h3>Check-in history</h3><ul>",
        )?;
        for entry in self.history.recent(RECENT_ENTRIES) {
            write!(out, "<li>{entry}</li>")?;
        }
        out.write_str("</ul></body></html>\r\n")
    }

    fn draw(&self, fb: &mut Framebuffer) {
        let mut status = heapless::String::<16>::new();
        let _ = fmt::Write::write_fmt(&mut status, format_args!("PRESENT {}", self.present_count()));
        fb.draw_str(0, 0, &status);

        let present = USERS.iter().zip(self.present).filter(|(_, p)| *p);
        for (row, (user, _)) in present.enumerate() {
            fb.draw_str(0, ((row + 2) * PAGE_HEIGHT) as u32, user);
        }
    }
}

fn write_capitalized<W: fmt::Write>(out: &mut W, name: &str) -> fmt::Result {
    for (i, ch) in name.chars().enumerate() {
        out.write_char(if i == 0 { ch } else { ch.to_ascii_lowercase() })?;
    }
    Ok(())
}
