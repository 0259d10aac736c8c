//! Row-oriented status display.
//!
//! Implements [`DisplayPort`] as a fixed set of text rows.  `print` only
//! stores the text and marks the row dirty; `update` (driven by the display
//! refresh timer) flushes dirty rows to the serial console, which is the
//! board's only screen.
//!
//! Rows are truncated to [`ROW_WIDTH`] characters.

use core::fmt::Write;

use heapless::String;
use log::info;

use crate::app::ports::{DisplayPort, DisplayRow};

/// Characters per row.
pub const ROW_WIDTH: usize = 32;

pub type RowText = String<ROW_WIDTH>;

pub struct RowDisplay {
    rows: [RowText; DisplayRow::COUNT],
    dirty: [bool; DisplayRow::COUNT],
    refreshes: u32,
}

impl RowDisplay {
    pub fn new() -> Self {
        Self {
            rows: core::array::from_fn(|_| RowText::new()),
            dirty: [false; DisplayRow::COUNT],
            refreshes: 0,
        }
    }

    pub fn row(&self, row: DisplayRow) -> &str {
        self.rows[row.index()].as_str()
    }

    pub fn is_dirty(&self, row: DisplayRow) -> bool {
        self.dirty[row.index()]
    }

    pub fn refreshes(&self) -> u32 {
        self.refreshes
    }

    fn label(row: DisplayRow) -> &'static str {
        match row {
            DisplayRow::Name => "name",
            DisplayRow::Address => "addr",
            DisplayRow::Connection => "conn",
            DisplayRow::Status => "status",
            DisplayRow::Humidity => "rh",
            DisplayRow::Authority => "auth",
            DisplayRow::Friend => "friend",
            DisplayRow::AlertCaretaker => "caretaker",
            DisplayRow::AlertPatient => "patient",
        }
    }
}

impl Default for RowDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayPort for RowDisplay {
    fn print(&mut self, row: DisplayRow, text: &str) {
        let slot = &mut self.rows[row.index()];
        if slot.as_str() == text {
            return;
        }
        slot.clear();
        for c in text.chars() {
            if slot.push(c).is_err() {
                break;
            }
        }
        self.dirty[row.index()] = true;
    }

    fn update(&mut self) {
        self.refreshes = self.refreshes.wrapping_add(1);
        for row in DisplayRow::ALL {
            if !core::mem::take(&mut self.dirty[row.index()]) {
                continue;
            }
            let mut line: String<48> = String::new();
            let _ = write!(line, "{:>9} | {}", Self::label(row), self.rows[row.index()]);
            info!("LCD | {line}");
        }
    }
}
