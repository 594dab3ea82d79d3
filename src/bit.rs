//! Bit identities placed on the reduction board.
//!
//! A bit is either a partial product seeded from the multiplier grid, or the
//! sum/carry output of an adder placed by a stage. Its label is its identity;
//! the row is a layout hint that the engine carries but never interprets.

use serde::{Deserialize, Serialize};

/// Constant-zero label. Never lives in a column and never needs removal.
pub const ZERO: &str = "1'b0";

/// Constant-one label.
pub const ONE: &str = "1'b1";

/// Returns true for the two constant labels.
pub fn is_constant(label: &str) -> bool {
    label == ZERO || label == ONE
}

/// Origin of a bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BitKind {
    /// Partial product `pp{i}[{j}]`
    Pp,
    /// Sum output of a half/full adder
    Sum,
    /// Carry output of a half/full adder
    Carry,
}

impl std::fmt::Display for BitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BitKind::Pp => write!(f, "PP"),
            BitKind::Sum => write!(f, "SUM"),
            BitKind::Carry => write!(f, "CARRY"),
        }
    }
}

/// One bit on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bit {
    pub label: String,
    pub kind: BitKind,
    /// Weight index.
    pub column: usize,
    /// Layout row, carried through untouched.
    pub row: usize,
    /// Stage that created this bit (None for partial products).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Colour of the originating stage, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Bit {
    /// Partial product `pp{i}[{j}]`, placed in column `i + j` on row `i`.
    pub fn partial_product(i: usize, j: usize) -> Self {
        Self {
            label: format!("pp{}[{}]", i, j),
            kind: BitKind::Pp,
            column: i + j,
            row: i,
            stage: None,
            color: None,
        }
    }

    /// Adder output created by `stage`.
    pub fn output(
        label: impl Into<String>,
        kind: BitKind,
        column: usize,
        row: usize,
        stage: &str,
        color: Option<&str>,
    ) -> Self {
        Self {
            label: label.into(),
            kind,
            column,
            row,
            stage: Some(stage.to_string()),
            color: color.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_product_weight_and_row() {
        let bit = Bit::partial_product(2, 3);
        assert_eq!(bit.label, "pp2[3]");
        assert_eq!(bit.column, 5);
        assert_eq!(bit.row, 2);
        assert_eq!(bit.kind, BitKind::Pp);
        assert!(bit.stage.is_none());
    }

    #[test]
    fn test_constants() {
        assert!(is_constant(ZERO));
        assert!(is_constant(ONE));
        assert!(!is_constant("pp0[0]"));
    }

    #[test]
    fn test_bit_kind_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&BitKind::Carry).unwrap(), "\"CARRY\"");
        assert_eq!(BitKind::Pp.to_string(), "PP");
    }
}
