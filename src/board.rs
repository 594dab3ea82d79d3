//! Column store for the reduction board.
//!
//! The board is an array of per-weight columns. Each column is an ordered
//! list of bits that behaves as a stack for implicit consumption: the most
//! recently pushed bit is popped first. Explicit consumption may remove a
//! bit from any position, and every removal is recorded with its position
//! so that it can be reinstated exactly.

use serde::{Deserialize, Serialize};

use crate::bit::{Bit, ZERO, is_constant};

/// Upper bound on the number of columns a write-back may grow the board to.
pub const MAX_COLUMNS: usize = 1 << 16;

/// Column index a write-back at `column` lands in, if the board may hold it.
///
/// `None` is an overflowed index (`column + 1` past `i64::MAX`).
pub fn write_column(column: Option<i64>) -> Result<usize, &'static str> {
    let column = column.ok_or("exceeds the column limit")?;
    let index = usize::try_from(column).map_err(|_| "< 0")?;
    if index >= MAX_COLUMNS {
        return Err("exceeds the column limit");
    }
    Ok(index)
}

/// A bit removed from the board, together with where it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taken {
    pub bit: Bit,
    pub column: usize,
    pub index: usize,
}

/// Outcome of resolving one placement's inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Tokens to wire into the adder, in order. May contain constants and
    /// unresolved labels.
    pub tokens: Vec<String>,
    /// Bits actually removed from the board, in removal order.
    pub consumed: Vec<Taken>,
    /// Explicit tokens that matched nothing on the board.
    pub missing: Vec<String>,
    /// The implicit target column was outside the allocated range.
    pub out_of_range: bool,
}

/// The reduction board: one column of bits per weight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    columns: Vec<Vec<Bit>>,
}

impl Board {
    /// Empty board with `width` empty columns.
    pub fn with_columns(width: usize) -> Self {
        Self {
            columns: vec![Vec::new(); width],
        }
    }

    /// Seed the partial-product grid of an N×N multiplier.
    ///
    /// Produces `2N-1` columns; column `c` receives `pp{i}[{j}]` for every
    /// `i + j == c` in increasing `i`, so the highest row sits on top of
    /// the stack.
    pub fn seeded(n: usize) -> Self {
        let mut board = Self::with_columns((2 * n).saturating_sub(1));
        for i in 0..n {
            for j in 0..n {
                let bit = Bit::partial_product(i, j);
                board.columns[bit.column].push(bit);
            }
        }
        board
    }

    pub fn columns(&self) -> &[Vec<Bit>] {
        &self.columns
    }

    /// Bits of one column; empty for indices beyond the allocated range.
    pub fn column(&self, index: usize) -> &[Bit] {
        self.columns.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of allocated columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Total number of live bits.
    pub fn bit_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// Labels of one column in insertion order.
    pub fn labels(&self, index: usize) -> Vec<&str> {
        self.column(index).iter().map(|b| b.label.as_str()).collect()
    }

    /// Locate a label as (column, index).
    pub fn find(&self, label: &str) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(col, bits)| {
            bits.iter()
                .position(|b| b.label == label)
                .map(|index| (col, index))
        })
    }

    pub fn contains(&self, label: &str) -> bool {
        self.find(label).is_some()
    }

    pub fn get(&self, label: &str) -> Option<&Bit> {
        self.find(label).map(|(col, idx)| &self.columns[col][idx])
    }

    fn take_at(&mut self, column: usize, index: usize) -> Taken {
        let bit = self.columns[column].remove(index);
        Taken { bit, column, index }
    }

    /// Remove the first bit labelled `label` in `column`.
    pub fn take_from_column(&mut self, column: usize, label: &str) -> Option<Taken> {
        let index = self.columns.get(column)?.iter().position(|b| b.label == label)?;
        Some(self.take_at(column, index))
    }

    /// Remove the first bit labelled `label`, searching every column in order.
    pub fn take_anywhere(&mut self, label: &str) -> Option<Taken> {
        let (column, index) = self.find(label)?;
        Some(self.take_at(column, index))
    }

    /// Pop the most recently pushed bit of `column`.
    pub fn pop_top(&mut self, column: usize) -> Option<Taken> {
        let bits = self.columns.get_mut(column)?;
        let index = bits.len().checked_sub(1)?;
        let bit = bits.remove(index);
        Some(Taken { bit, column, index })
    }

    /// Append a bit to `column`, growing the column array on demand.
    pub fn push(&mut self, column: usize, bit: Bit) {
        if column >= self.columns.len() {
            self.columns.resize_with(column + 1, Vec::new);
        }
        self.columns[column].push(bit);
    }

    /// Put a removed bit back where it was taken from.
    ///
    /// Reinstating a sequence of removals in reverse removal order restores
    /// the original column order exactly.
    pub fn reinstate(&mut self, taken: Taken) {
        if taken.column >= self.columns.len() {
            self.columns.resize_with(taken.column + 1, Vec::new);
        }
        let bits = &mut self.columns[taken.column];
        let index = taken.index.min(bits.len());
        bits.insert(index, taken.bit);
    }

    /// Drop empty trailing columns until the board is `width` wide.
    pub fn shrink_to(&mut self, width: usize) {
        while self.columns.len() > width && self.columns.last().is_some_and(Vec::is_empty) {
            self.columns.pop();
        }
    }

    /// Resolve a caller-supplied input list.
    ///
    /// Constants are accepted without removal. Every other token is looked
    /// up in the preferred column first, then in every column in order; the
    /// first match is removed. Tokens that match nothing are still wired
    /// and reported in `missing`.
    pub fn resolve_explicit(&mut self, preferred: i64, tokens: &[String]) -> Resolution {
        let mut resolution = Resolution {
            tokens: tokens.to_vec(),
            ..Resolution::default()
        };
        for token in tokens {
            if is_constant(token) {
                continue;
            }
            let taken = usize::try_from(preferred)
                .ok()
                .and_then(|col| self.take_from_column(col, token))
                .or_else(|| self.take_anywhere(token));
            match taken {
                Some(taken) => resolution.consumed.push(taken),
                None => resolution.missing.push(token.clone()),
            }
        }
        resolution
    }

    /// Resolve inputs by popping `need` bits off the top of `column`.
    ///
    /// An exhausted column yields `ZERO` for each missing slot. A column
    /// outside the allocated range counts as fully exhausted.
    pub fn resolve_implicit(&mut self, column: i64, need: usize) -> Resolution {
        let mut resolution = Resolution::default();
        let target = usize::try_from(column)
            .ok()
            .filter(|col| *col < self.columns.len());
        let Some(col) = target else {
            resolution.out_of_range = true;
            resolution.tokens = vec![ZERO.to_string(); need];
            return resolution;
        };
        for _ in 0..need {
            match self.pop_top(col) {
                Some(taken) => {
                    resolution.tokens.push(taken.bit.label.clone());
                    resolution.consumed.push(taken);
                }
                None => resolution.tokens.push(ZERO.to_string()),
            }
        }
        resolution
    }
}
