//! Reduction engine: applies stage placements to a board.
//!
//! The same code path serves the batch generator, the interactive session
//! and the history replayer. Placements are processed strictly in declared
//! order; implicit inputs pop from the top of the target column, so order
//! decides which bits are consumed.
//!
//! Nothing in here fails. Missing inputs, out-of-range columns and unknown
//! adder types degrade to warnings formatted as Verilog comments.

use serde::{Deserialize, Serialize};

use crate::bit::{Bit, BitKind, ZERO};
use crate::board::{Board, Taken, write_column};
use crate::plan::{AdderKind, Placement, Stage};

/// Stage-local running counters.
///
/// `sum_seq` and `carry_seq` advance once per placement regardless of type;
/// `ha_idx` and `fa_idx` advance per adder type for instance naming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCursor {
    pub sum_seq: usize,
    pub carry_seq: usize,
    pub ha_idx: usize,
    pub fa_idx: usize,
}

impl StageCursor {
    fn advance(&mut self, kind: &AdderKind) {
        self.sum_seq += 1;
        self.carry_seq += 1;
        match kind {
            AdderKind::Half => self.ha_idx += 1,
            AdderKind::Full => self.fa_idx += 1,
            AdderKind::Unknown(_) => {}
        }
    }

    /// Step back over one placement of `kind`.
    pub fn retreat(&mut self, kind: &AdderKind) {
        self.sum_seq = self.sum_seq.saturating_sub(1);
        self.carry_seq = self.carry_seq.saturating_sub(1);
        match kind {
            AdderKind::Half => self.ha_idx = self.ha_idx.saturating_sub(1),
            AdderKind::Full => self.fa_idx = self.fa_idx.saturating_sub(1),
            AdderKind::Unknown(_) => {}
        }
    }
}

/// Output names to reuse instead of allocating new ones (redo).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForcedLabels {
    pub sum: String,
    pub carry: String,
    pub instance: Option<String>,
}

/// Everything one placement did to the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applied {
    pub kind: AdderKind,
    pub column: i64,
    /// Tokens wired into the adder, padded/truncated to its arity.
    pub inputs: Vec<String>,
    /// Bits removed from the board, in removal order.
    pub consumed: Vec<Taken>,
    pub sum: String,
    pub carry: String,
    pub sum_written: bool,
    pub carry_written: bool,
    pub instance: Option<String>,
    pub line: Option<String>,
    pub warnings: Vec<String>,
}

impl Applied {
    /// Labels this placement left on the board.
    pub fn created_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if self.sum_written {
            labels.push(self.sum.clone());
        }
        if self.carry_written {
            labels.push(self.carry.clone());
        }
        labels
    }
}

/// Result of applying a whole stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    pub stage: String,
    pub sum_bus: String,
    pub carry_bus: String,
    pub sum_width: usize,
    pub carry_width: usize,
    pub color: Option<String>,
    pub instances: Vec<String>,
    pub warnings: Vec<String>,
    pub placements: Vec<Applied>,
}

fn warn(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{}", message);
    warnings.push(format!("// WARNING: {}", message));
}

/// Apply one placement, advancing `cursor`.
pub fn apply_placement(
    board: &mut Board,
    stage: &Stage,
    cursor: &mut StageCursor,
    placement: &Placement,
    forced: Option<&ForcedLabels>,
) -> Applied {
    let column = placement.column;
    let kind = placement.kind.clone();
    let mut warnings = Vec::new();

    let resolution = match placement.explicit_inputs() {
        Some(tokens) => board.resolve_explicit(column, tokens),
        None => board.resolve_implicit(column, kind.arity()),
    };
    for token in &resolution.missing {
        warn(
            &mut warnings,
            format!(
                "Stage {} col {} explicit input not found on the board: {} (mismatched name or reused bit)",
                stage.name, column, token
            ),
        );
    }
    if resolution.out_of_range {
        warn(
            &mut warnings,
            format!(
                "Stage {} col {} is out of range, no bits available, padding with {}",
                stage.name, column, ZERO
            ),
        );
    }

    let (sum, carry) = match forced {
        Some(f) => (f.sum.clone(), f.carry.clone()),
        None => (
            format!("{}[{}]", stage.sum_bus_name(), cursor.sum_seq),
            format!("{}[{}]", stage.carry_bus_name(), cursor.carry_seq),
        ),
    };

    let type_index = match kind {
        AdderKind::Half => Some(cursor.ha_idx),
        AdderKind::Full => Some(cursor.fa_idx),
        AdderKind::Unknown(_) => None,
    };
    cursor.advance(&kind);

    let mut inputs = resolution.tokens.clone();
    inputs.resize(kind.arity(), ZERO.to_string());

    let mut applied = Applied {
        kind: kind.clone(),
        column,
        inputs,
        consumed: resolution.consumed,
        sum,
        carry,
        sum_written: false,
        carry_written: false,
        instance: None,
        line: None,
        warnings,
    };

    let Some(type_index) = type_index else {
        warn(
            &mut applied.warnings,
            format!(
                "Unknown adder type '{}' at stage {}, col {} (skipped)",
                kind, stage.name, column
            ),
        );
        return applied;
    };

    let instance = forced
        .and_then(|f| f.instance.clone())
        .unwrap_or_else(|| stage.instance_name(&kind, type_index));
    let line = match kind {
        AdderKind::Full => format!(
            "  FullAdder {} ( {}, {}, {}, {}, {} );",
            instance,
            applied.inputs[0],
            applied.inputs[1],
            applied.inputs[2],
            applied.sum,
            applied.carry
        ),
        _ => format!(
            "  HalfAdder {} ( {}, {}, {}, {} );",
            instance, applied.inputs[0], applied.inputs[1], applied.sum, applied.carry
        ),
    };
    tracing::debug!(stage = %stage.name, column, "{}", line.trim());
    applied.instance = Some(instance);
    applied.line = Some(line);

    let row = applied
        .consumed
        .iter()
        .map(|t| t.bit.row)
        .min()
        .unwrap_or(0);
    let color = stage.color.as_deref();

    match write_column(Some(column)) {
        Ok(col) => {
            let bit = Bit::output(&applied.sum, BitKind::Sum, col, row, &stage.name, color);
            board.push(col, bit);
            applied.sum_written = true;
        }
        Err(reason) => warn(
            &mut applied.warnings,
            format!(
                "SUM write-back column {} {} dropped: {}",
                column, reason, applied.sum
            ),
        ),
    }

    match write_column(column.checked_add(1)) {
        Ok(col) => {
            let bit = Bit::output(&applied.carry, BitKind::Carry, col, row, &stage.name, color);
            board.push(col, bit);
            applied.carry_written = true;
        }
        Err(reason) => warn(
            &mut applied.warnings,
            format!(
                "CARRY write-back column {} {} dropped: {}",
                i128::from(column) + 1,
                reason,
                applied.carry
            ),
        ),
    }

    applied
}

/// Apply every placement of `stage` in order, starting from fresh counters.
pub fn apply_stage(board: &mut Board, stage: &Stage) -> StageOutput {
    let mut cursor = StageCursor::default();
    let mut output = StageOutput {
        stage: stage.name.clone(),
        sum_bus: stage.sum_bus_name(),
        carry_bus: stage.carry_bus_name(),
        sum_width: 0,
        carry_width: 0,
        color: stage.color.clone(),
        instances: Vec::new(),
        warnings: Vec::new(),
        placements: Vec::with_capacity(stage.placements.len()),
    };

    for placement in &stage.placements {
        let applied = apply_placement(board, stage, &mut cursor, placement, None);
        output.instances.extend(applied.line.iter().cloned());
        output.warnings.extend(applied.warnings.iter().cloned());
        output.placements.push(applied);
    }

    output.sum_width = cursor.sum_seq;
    output.carry_width = cursor.carry_seq;
    output
}
