//! Batch generation of the reduction-network module.
//!
//! This module provides the headless path: seed the board for the plan's
//! width, run every stage through the engine in plan order, finalize the
//! survivors into `opa`/`opb`, and render the module text.
//!
//! The text layout is:
//!
//! ```text
//! module <name> ( pp0..pp{N-1} inputs, opa/opb outputs );
//! <per-stage wire declarations>
//! <per-stage instance blocks, in plan order>
//! assign opa/opb
//! <warnings comment block, if any>
//! endmodule
//! ```
//!
//! `HalfAdder`/`FullAdder` cells are expected to be provided externally.

use crate::board::Board;
use crate::engine::{StageOutput, apply_stage};
use crate::finalize::{Operands, finalize};
use crate::plan::Plan;

/// Rendering switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Append the collected warnings as a comment block.
    pub embed_warnings: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            embed_warnings: true,
        }
    }
}

/// Result of a batch generation run.
#[derive(Debug, Clone)]
pub struct Generated {
    pub text: String,
    /// Every structural anomaly, stage warnings first, then finalization.
    pub warnings: Vec<String>,
    pub stages: Vec<StageOutput>,
    /// Board after the last stage.
    pub board: Board,
    pub operands: Operands,
}

/// Run the plan with default options.
pub fn generate(plan: &Plan) -> Generated {
    generate_with(plan, GenerateOptions::default())
}

/// Run the plan from the seeded board and render the module.
pub fn generate_with(plan: &Plan, options: GenerateOptions) -> Generated {
    let mut board = Board::seeded(plan.n);
    let stages: Vec<StageOutput> = plan
        .stages
        .iter()
        .map(|stage| apply_stage(&mut board, stage))
        .collect();
    let operands = finalize(&board, plan.output_width());
    let text = render(plan, &stages, &operands, options);

    let warnings = stages
        .iter()
        .flat_map(|s| s.warnings.iter().cloned())
        .chain(operands.warnings.iter().cloned())
        .collect();

    tracing::info!(
        module = %plan.module_name(),
        stages = stages.len(),
        "generated reduction network"
    );

    Generated {
        text,
        warnings,
        stages,
        board,
        operands,
    }
}

/// Wire declarations for one stage's sum and carry buses.
///
/// A stage without placements still declares each bus, unindexed.
pub fn declarations(output: &StageOutput) -> Vec<String> {
    let declare = |bus: &str, width: usize| {
        if width > 0 {
            format!("  wire [{}:0] {};", width - 1, bus)
        } else {
            format!("  wire {}; // empty", bus)
        }
    };
    let mut lines = vec![
        declare(&output.sum_bus, output.sum_width),
        declare(&output.carry_bus, output.carry_width),
    ];
    if let Some(color) = &output.color {
        lines.push(format!("  // stage {} color {}", output.stage, color));
    }
    lines
}

/// Render the module text from already-applied stages.
pub fn render(
    plan: &Plan,
    stages: &[StageOutput],
    operands: &Operands,
    options: GenerateOptions,
) -> String {
    let n = plan.n;
    let w = plan.output_width();
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("module {} (", plan.module_name()));
    for i in 0..n {
        lines.push(format!("  input wire [{}:0] pp{},", n.saturating_sub(1), i));
    }
    lines.push(format!("  output wire [{}:0] opa,", w.saturating_sub(1)));
    lines.push(format!("  output wire [{}:0] opb", w.saturating_sub(1)));
    lines.push(");".to_string());
    lines.push(String::new());

    let decls: Vec<String> = stages.iter().flat_map(declarations).collect();
    if !decls.is_empty() {
        lines.extend(decls);
        lines.push(String::new());
    }

    for stage in stages {
        lines.push(format!("  // ===== Stage {} =====", stage.stage));
        lines.extend(stage.instances.iter().cloned());
        lines.push(String::new());
    }

    lines.extend(operands.assign_lines());
    lines.push(String::new());

    let warnings: Vec<&String> = stages
        .iter()
        .flat_map(|s| s.warnings.iter())
        .chain(operands.warnings.iter())
        .collect();
    if options.embed_warnings && !warnings.is_empty() {
        lines.push("  // ---------------- Warnings ----------------".to_string());
        lines.extend(warnings.into_iter().cloned());
        lines.push(String::new());
    }

    lines.push("endmodule".to_string());
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Placement, Stage};

    #[test]
    fn test_empty_two_by_two_module() {
        let text = generate(&Plan::new(2)).text;
        let expected = "\
module WallaceTree2x2 (
  input wire [1:0] pp0,
  input wire [1:0] pp1,
  output wire [3:0] opa,
  output wire [3:0] opb
);

  assign opa = {1'b0, pp1[1], pp0[1], pp0[0]};
  assign opb = {1'b0, 1'b0, pp1[0], 1'b0};

endmodule
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_single_half_adder_module() {
        let plan = Plan::new(2).with_stages(vec![
            Stage::new("s1").with_placements(vec![Placement::half(1)]),
        ]);
        let generated = generate(&plan);
        let expected = "\
module WallaceTree2x2 (
  input wire [1:0] pp0,
  input wire [1:0] pp1,
  output wire [3:0] opa,
  output wire [3:0] opb
);

  wire [0:0] s1_S;
  wire [0:0] s1_C;

  // ===== Stage s1 =====
  HalfAdder s1ha0 ( pp1[0], pp0[1], s1_S[0], s1_C[0] );

  assign opa = {1'b0, pp1[1], s1_S[0], pp0[0]};
  assign opb = {1'b0, s1_C[0], 1'b0, 1'b0};

endmodule
";
        assert_eq!(generated.text, expected);
        assert!(generated.warnings.is_empty());
        assert_eq!(generated.board.labels(2), vec!["pp1[1]", "s1_C[0]"]);
    }

    #[test]
    fn test_empty_stage_declares_unindexed_wires() {
        let mut stage = Stage::new("e");
        stage.color = Some("#43A047".into());
        let plan = Plan::new(2).with_stages(vec![stage]);
        let text = generate(&plan).text;
        assert!(text.contains("  wire e_S; // empty\n"));
        assert!(text.contains("  wire e_C; // empty\n"));
        assert!(text.contains("  // stage e color #43A047\n"));
        assert!(text.contains("  // ===== Stage e =====\n"));
    }

    #[test]
    fn test_warnings_block_is_embedded_and_optional() {
        let plan = Plan::new(3);
        // column 2 of a 3x3 board keeps three survivors
        let generated = generate(&plan);
        assert_eq!(generated.warnings.len(), 1);
        assert!(generated.text.contains("// ---------------- Warnings"));
        assert!(generated.text.contains("column 2 holds 3 bits"));

        let quiet = generate_with(
            &plan,
            GenerateOptions {
                embed_warnings: false,
            },
        );
        assert!(!quiet.text.contains("Warnings"));
        assert_eq!(quiet.warnings.len(), 1);
    }

    #[test]
    fn test_extreme_plan_column_still_generates() {
        let json = r#"{"N": 2, "stages": [{"name": "s", "adders": [{"type": "HA", "col": 9223372036854775807}]}]}"#;
        let plan = Plan::parse(json, std::path::Path::new("plan.json")).unwrap();
        let generated = generate(&plan);

        assert!(generated.text.starts_with("module WallaceTree2x2 ("));
        assert!(generated.text.trim_end().ends_with("endmodule"));
        assert!(
            generated
                .warnings
                .iter()
                .any(|w| w.contains("SUM write-back column 9223372036854775807"))
        );
        assert_eq!(generated.board, Board::seeded(2));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let plan = Plan::new(4).with_stages(vec![
            Stage::new("a").with_placements(vec![
                Placement::full(3),
                Placement::full(4),
                Placement::half(2),
            ]),
            Stage::new("b").with_placements(vec![Placement::full(4), Placement::half(5)]),
        ]);
        let first = generate(&plan);
        let second = generate(&plan);
        assert_eq!(first.text, second.text);
        assert_eq!(first.board, second.board);
    }
}
