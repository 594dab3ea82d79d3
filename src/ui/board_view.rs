//! Read-only text projections of boards and history for the CLI.

use console::style;

use crate::board::Board;
use crate::finalize::Operands;
use crate::history::{History, StageHistory};

/// Column table of `board`. Columns at or beyond `width` are flagged, as
/// are columns still holding more than two bits.
pub fn board_table(board: &Board, width: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>4}  {:>4}  {}\n", "col", "bits", "labels"));
    out.push_str(&format!("{:>4}  {:>4}  {}\n", "----", "----", "------"));
    for (col, bits) in board.columns().iter().enumerate() {
        let labels: Vec<&str> = bits.iter().map(|b| b.label.as_str()).collect();
        let mut line = format!("{:>4}  {:>4}  {}", col, bits.len(), labels.join(" "));
        if col >= width && !bits.is_empty() {
            line.push_str(&format!("  {}", style("(beyond output)").red()));
        } else if bits.len() > 2 {
            line.push_str(&format!("  {}", style("(needs reduction)").yellow()));
        }
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&format!(
        "{} bits across {} columns\n",
        board.bit_count(),
        board.width()
    ));
    out
}

fn entry_report(entry: &StageHistory) -> String {
    let mut out = format!(
        "Stage {} (compared to {})\n",
        style(&entry.stage).bold(),
        entry.compare_to
    );
    out.push_str(&format!(
        "  instances: {}  new labels: {}  wires: {}  warnings: {}\n",
        entry.output.instances.len(),
        entry.new_labels.len(),
        entry.wires.len(),
        entry.output.warnings.len()
    ));
    out.push_str(&format!(
        "  bits: {} -> {}\n",
        entry.before.bit_count(),
        entry.after.bit_count()
    ));
    for wire in &entry.wires {
        out.push_str(&format!("  {} -> {}\n", wire.from, wire.to));
    }
    for warning in &entry.output.warnings {
        out.push_str(&format!("  {}\n", style(warning).yellow()));
    }
    out
}

/// Audit trail report, for every stage or just `stage`.
///
/// Returns `None` when `stage` names no recorded stage.
pub fn history_report(history: &History, stage: Option<&str>) -> Option<String> {
    match stage {
        Some(name) => history.get(name).map(entry_report),
        None if history.is_empty() => Some("No committed stages.\n".to_string()),
        None => Some(
            history
                .entries()
                .iter()
                .map(entry_report)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
    }
}

/// The two assign lines plus a warning count.
pub fn operand_summary(operands: &Operands) -> String {
    let [opa, opb] = operands.assign_lines();
    let mut out = format!("{}\n{}\n", opa.trim(), opb.trim());
    if !operands.warnings.is_empty() {
        out.push_str(&format!(
            "{} finalization warning(s)\n",
            operands.warnings.len()
        ));
    }
    out
}
