//! Replay-derived audit trail of committed stages.
//!
//! History is never patched by hand. Whenever the committed stage list
//! changes, the trail is recomputed by replaying the stages from the seeded
//! board through the same engine the batch generator uses, so replaying a
//! plan here and generating it in batch give identical boards and text.
//!
//! Replays are memoized by prefix: entries whose stage definition is
//! unchanged (and every entry before them) are kept, the rest recomputed.

use serde::Serialize;

use crate::board::Board;
use crate::engine::{StageOutput, apply_stage};
use crate::finalize::finalize;
use crate::generate::{GenerateOptions, render};
use crate::plan::{Plan, Stage};

/// Label of the pseudo-stage the first stage is compared against.
pub const SEED_NAME: &str = "PP";

/// One consumed-input → output edge created by a placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wire {
    pub from: String,
    pub to: String,
}

/// Snapshot pair and wiring for one committed stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageHistory {
    pub stage: String,
    /// Previous stage name, or `PP` for the first stage.
    pub compare_to: String,
    pub before: Board,
    pub after: Board,
    pub wires: Vec<Wire>,
    pub new_labels: Vec<String>,
    pub output: StageOutput,
    #[serde(skip)]
    definition: Stage,
}

/// The complete audit trail for one width.
#[derive(Debug, Clone, Serialize)]
pub struct History {
    n: usize,
    seeded: Board,
    entries: Vec<StageHistory>,
}

impl History {
    /// Empty trail for width `n`.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            seeded: Board::seeded(n),
            entries: Vec::new(),
        }
    }

    /// Replay `stages` from the seeded board.
    pub fn replay(n: usize, stages: &[Stage]) -> Self {
        let mut history = Self::new(n);
        history.extend_from(stages, 0);
        history
    }

    /// Bring the trail in line with `stages`, reusing the unchanged prefix.
    /// Returns the number of entries reused.
    pub fn refresh(&mut self, n: usize, stages: &[Stage]) -> usize {
        if n != self.n {
            *self = Self::new(n);
        }
        let reused = self
            .entries
            .iter()
            .zip(stages)
            .take_while(|(entry, stage)| entry.definition == **stage)
            .count();
        self.entries.truncate(reused);
        self.extend_from(stages, reused);
        tracing::info!(
            reused,
            replayed = stages.len() - reused,
            "history rebuilt from committed stages"
        );
        reused
    }

    fn extend_from(&mut self, stages: &[Stage], start: usize) {
        let mut board = self.board_after(start).clone();
        for stage in &stages[start..] {
            let compare_to = self
                .entries
                .last()
                .map(|e| e.stage.clone())
                .unwrap_or_else(|| SEED_NAME.to_string());
            let before = board.clone();
            let output = apply_stage(&mut board, stage);

            let mut wires = Vec::new();
            let mut new_labels = Vec::new();
            for applied in &output.placements {
                let created = applied.created_labels();
                for taken in &applied.consumed {
                    for to in &created {
                        wires.push(Wire {
                            from: taken.bit.label.clone(),
                            to: to.clone(),
                        });
                    }
                }
                new_labels.extend(created);
            }

            self.entries.push(StageHistory {
                stage: stage.name.clone(),
                compare_to,
                before,
                after: board.clone(),
                wires,
                new_labels,
                output,
                definition: stage.clone(),
            });
        }
    }

    pub fn width(&self) -> usize {
        self.n
    }

    pub fn seeded(&self) -> &Board {
        &self.seeded
    }

    pub fn entries(&self) -> &[StageHistory] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, stage: &str) -> Option<&StageHistory> {
        self.entries.iter().find(|e| e.stage == stage)
    }

    /// Board after the first `k` stages; `k == 0` is the seeded board.
    /// `k` is clamped to the number of entries.
    pub fn board_after(&self, k: usize) -> &Board {
        match k.min(self.entries.len()) {
            0 => &self.seeded,
            k => &self.entries[k - 1].after,
        }
    }

    /// Board after every recorded stage.
    pub fn final_board(&self) -> &Board {
        self.board_after(self.entries.len())
    }

    /// Render the module text for `plan` from the recorded stage outputs.
    pub fn render(&self, plan: &Plan, options: GenerateOptions) -> String {
        let outputs: Vec<StageOutput> = self.entries.iter().map(|e| e.output.clone()).collect();
        let operands = finalize(self.final_board(), plan.output_width());
        render(plan, &outputs, &operands, options)
    }
}
