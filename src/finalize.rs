//! Collapse the reduced board into the two final-adder operands.

use serde::{Deserialize, Serialize};

use crate::bit::ZERO;
use crate::board::Board;

/// The `opa`/`opb` operand bits, indexed by column (LSB first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operands {
    pub opa: Vec<String>,
    pub opb: Vec<String>,
    pub warnings: Vec<String>,
}

impl Operands {
    /// Verilog concatenation of `bits`, most significant column first.
    pub fn concat(bits: &[String]) -> String {
        let msb_first: Vec<&str> = bits.iter().rev().map(String::as_str).collect();
        format!("{{{}}}", msb_first.join(", "))
    }

    pub fn assign_lines(&self) -> [String; 2] {
        [
            format!("  assign opa = {};", Self::concat(&self.opa)),
            format!("  assign opb = {};", Self::concat(&self.opb)),
        ]
    }
}

/// Collapse columns `0..width` of `board`.
///
/// | survivors | opa    | opb    |
/// |-----------|--------|--------|
/// | 0         | ZERO   | ZERO   |
/// | 1         | first  | ZERO   |
/// | 2         | first  | second |
/// | >2        | first  | second | (+ truncation warning)
///
/// Columns at or beyond `width` never reach the output.
pub fn finalize(board: &Board, width: usize) -> Operands {
    let mut operands = Operands {
        opa: vec![ZERO.to_string(); width],
        opb: vec![ZERO.to_string(); width],
        warnings: Vec::new(),
    };

    for col in 0..width.min(board.width()) {
        let bits = board.column(col);
        if let Some(first) = bits.first() {
            operands.opa[col] = first.label.clone();
        }
        if let Some(second) = bits.get(1) {
            operands.opb[col] = second.label.clone();
        }
        if bits.len() > 2 {
            let message = format!(
                "column {} holds {} bits > 2, truncated to the first two for opa/opb",
                col,
                bits.len()
            );
            tracing::warn!("{}", message);
            operands.warnings.push(format!("// WARNING: {}", message));
        }
    }

    let stranded: usize = (width..board.width()).map(|c| board.column(c).len()).sum();
    if stranded > 0 {
        tracing::warn!(
            stranded,
            "bits left beyond output column {} are not part of opa/opb",
            width.saturating_sub(1)
        );
    }

    operands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit::{Bit, BitKind};

    fn board_with(columns: &[&[&str]]) -> Board {
        let mut board = Board::with_columns(columns.len());
        for (col, labels) in columns.iter().enumerate() {
            for label in labels.iter() {
                board.push(col, Bit::output(*label, BitKind::Sum, col, 0, "t", None));
            }
        }
        board
    }

    #[test]
    fn test_finalization_table() {
        let board = board_with(&[&[], &["a"], &["b", "c"], &["d", "e", "f"]]);
        let ops = finalize(&board, 4);
        assert_eq!(ops.opa, vec![ZERO, "a", "b", "d"]);
        assert_eq!(ops.opb, vec![ZERO, ZERO, "c", "e"]);
        assert_eq!(ops.warnings.len(), 1);
        assert!(ops.warnings[0].contains("column 3 holds 3 bits"));
    }

    #[test]
    fn test_seeded_two_by_two_without_stages() {
        let ops = finalize(&Board::seeded(2), 4);
        assert_eq!(ops.opa, vec!["pp0[0]", "pp0[1]", "pp1[1]", ZERO]);
        assert_eq!(ops.opb, vec![ZERO, "pp1[0]", ZERO, ZERO]);
        assert!(ops.warnings.is_empty());
        assert_eq!(
            ops.assign_lines()[0],
            "  assign opa = {1'b0, pp1[1], pp0[1], pp0[0]};"
        );
        assert_eq!(
            ops.assign_lines()[1],
            "  assign opb = {1'b0, 1'b0, pp1[0], 1'b0};"
        );
    }

    #[test]
    fn test_columns_beyond_width_are_ignored() {
        let board = board_with(&[&["a"], &["b"], &["c"]]);
        let ops = finalize(&board, 2);
        assert_eq!(ops.opa, vec!["a", "b"]);
        assert!(ops.warnings.is_empty());
    }
}
