//! A1-notation cell references.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellRefError {
    #[error("Empty cell reference")]
    Empty,

    #[error("Invalid cell reference: {0}")]
    Invalid(String),
}

/// A single cell address, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub column: u32,
}

impl CellRef {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Column letters for a 1-based index (`1` → `A`, `27` → `AA`).
    pub fn column_letters(mut column: u32) -> String {
        let mut letters = Vec::new();
        while column > 0 {
            let rem = (column - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            column = (column - 1) / 26;
        }
        letters.iter().rev().collect()
    }

    /// Render as A1 notation.
    pub fn to_a1(&self) -> String {
        format!("{}{}", Self::column_letters(self.column), self.row)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

impl FromStr for CellRef {
    type Err = CellRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CellRefError::Empty);
        }

        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| CellRefError::Invalid(s.to_string()))?;
        let (letters, digits) = s.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CellRefError::Invalid(s.to_string()));
        }

        let mut column: u32 = 0;
        for c in letters.chars() {
            let value = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
            column = column
                .checked_mul(26)
                .and_then(|v| v.checked_add(value))
                .ok_or_else(|| CellRefError::Invalid(s.to_string()))?;
        }

        let row: u32 = digits
            .parse()
            .map_err(|_| CellRefError::Invalid(s.to_string()))?;
        if row == 0 {
            return Err(CellRefError::Invalid(s.to_string()));
        }

        Ok(Self { row, column })
    }
}
