use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Convert a zero-based column index to its letter form (`0 -> A`, `27 -> AB`).
pub fn col_to_letters(mut col: u32) -> String {
    let mut buf = Vec::new();
    loop {
        buf.push(char::from(b'A' + (col % 26) as u8));
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.iter().rev().collect()
}

/// Parse upper-case column letters into a zero-based index.
pub fn letters_to_col(s: &str) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for (idx, ch) in s.bytes().enumerate() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?.checked_add((ch - b'A') as u32)?;
        if idx != s.len() - 1 {
            col = col.checked_add(1)?;
        }
    }
    Some(col)
}

/// Rectangular block of cells, zero-based and inclusive on both ends.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl CellRange {
    pub fn new(start: (u32, u32), end: (u32, u32)) -> Self {
        Self {
            start_row: start.0.min(end.0),
            start_col: start.1.min(end.1),
            end_row: start.0.max(end.0),
            end_col: start.1.max(end.1),
        }
    }

    /// Rows `first..=last` of a single column.
    pub fn column(col: u32, first_row: u32, last_row: u32) -> Self {
        Self::new((first_row, col), (last_row, col))
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }

    pub fn height(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn width(&self) -> u32 {
        self.end_col - self.start_col + 1
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            col_to_letters(self.start_col),
            self.start_row + 1,
            col_to_letters(self.end_col),
            self.end_row + 1
        )
    }
}
