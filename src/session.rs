//! Interactive stage lifecycle.
//!
//! A [`Planner`] owns the committed stage list, the live board and at most
//! one stage under construction. It is driven by [`Command`] values; every
//! mutation goes through [`Planner::execute`] and the caller renders the
//! resulting board as a read-only projection.
//!
//! ```text
//! Idle --open--> Editing --commit/discard--> Idle
//!   ^                                          |
//!   +------------- reopen (gated) <------------+
//! ```
//!
//! Undo/redo is scoped to the editing stage. Committed history is always
//! re-derived by [`History`] replay, never patched incrementally.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::engine::{Applied, ForcedLabels, StageCursor, apply_placement};
use crate::errors::SessionError;
use crate::history::History;
use crate::plan::{
    AdderKind, DEFAULT_CARRY_BUS, DEFAULT_FA_NAME_FMT, DEFAULT_HA_NAME_FMT, DEFAULT_SUM_BUS,
    Placement, Plan, Stage,
};

/// Stage colours assigned by stage index.
pub const PALETTE: [&str; 15] = [
    "#D81B60", "#1E88E5", "#43A047", "#FB8C00", "#8E24AA", "#00ACC1", "#F4511E", "#7CB342",
    "#3949AB", "#00897B", "#5E35B1", "#C0CA33", "#039BE5", "#FDD835", "#6D4C41",
];

/// Naming templates applied to newly opened stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTemplates {
    pub ha_name_fmt: String,
    pub fa_name_fmt: String,
    pub sum_bus: String,
    pub carry_bus: String,
    /// Prefix for auto-named stages (`stg1`, `stg2`, ...).
    pub stage_prefix: String,
}

impl Default for StageTemplates {
    fn default() -> Self {
        Self {
            ha_name_fmt: DEFAULT_HA_NAME_FMT.to_string(),
            fa_name_fmt: DEFAULT_FA_NAME_FMT.to_string(),
            sum_bus: DEFAULT_SUM_BUS.to_string(),
            carry_bus: DEFAULT_CARRY_BUS.to_string(),
            stage_prefix: "stg".to_string(),
        }
    }
}

/// How a batch placement groups its labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    Half,
    Full,
    /// Two labels become an HA, three an FA.
    Smart,
}

impl std::str::FromStr for BatchMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ha" => Ok(BatchMode::Half),
            "fa" => Ok(BatchMode::Full),
            "smart" => Ok(BatchMode::Smart),
            other => Err(SessionError::InvalidBatch(format!(
                "unknown batch mode '{}', expected ha, fa or smart",
                other
            ))),
        }
    }
}

/// One undoable edit of the editing stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Place {
        placement: Placement,
        applied: Applied,
        /// Board width before the placement grew it.
        width_before: usize,
    },
    Reposition {
        label: String,
        old: Option<f64>,
        new: f64,
    },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Place { applied, .. } => write!(
                f,
                "{} @ col {} -> {}, {}",
                applied.kind, applied.column, applied.sum, applied.carry
            ),
            Action::Reposition { label, new, .. } => write!(f, "move {} to {}", label, new),
        }
    }
}

/// The stage under construction with its action log.
#[derive(Debug, Clone)]
pub struct EditingStage {
    pub stage: Stage,
    pub cursor: StageCursor,
    undo: Vec<Action>,
    redo: Vec<Action>,
}

impl EditingStage {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            cursor: StageCursor::default(),
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}

/// Lifecycle state, as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Editing { stage: String },
}

/// Commands accepted by [`Planner::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Open a new stage; `None` picks the next free auto name.
    OpenStage { name: Option<String> },
    PlaceAdder(Placement),
    PlaceBatch {
        mode: BatchMode,
        column: i64,
        labels: Vec<String>,
        /// Pad a short trailing group with ZERO instead of skipping it.
        pad: bool,
    },
    Reposition { label: String, y: f64 },
    Undo,
    Redo,
    CommitStage,
    DiscardStage,
    /// Reopen a committed stage; later stages are discarded once confirmed.
    ReopenStage { name: String, confirmed: bool },
    /// Drop a stage and every stage after it.
    DeleteStage { name: String },
    /// Re-seed for a new width, clearing the plan.
    Rebuild { n: usize },
    /// Re-derive the live board by replay.
    Reset,
}

/// What a command did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Opened { stage: String },
    Placed {
        applied: Vec<Applied>,
        /// Label groups a batch left unplaced.
        skipped: Vec<Vec<String>>,
    },
    Repositioned { label: String, y: f64 },
    Undone(Option<Action>),
    Redone(Option<Action>),
    Committed { stage: String },
    Discarded { stage: String },
    Reopened { stage: String, discarded: Vec<String> },
    Deleted { removed: Vec<String> },
    Rebuilt { n: usize },
    Reset,
}

/// Interactive planner state.
#[derive(Debug, Clone)]
pub struct Planner {
    n: usize,
    module_name: Option<String>,
    templates: StageTemplates,
    committed: Vec<Stage>,
    pp_positions: BTreeMap<String, f64>,
    board: Board,
    editing: Option<EditingStage>,
    history: History,
}

impl Planner {
    /// Fresh planner for width `n`.
    pub fn new(n: usize, templates: StageTemplates) -> Result<Self, SessionError> {
        if n < 2 {
            return Err(SessionError::InvalidWidth { n });
        }
        Ok(Self {
            n,
            module_name: None,
            templates,
            committed: Vec::new(),
            pp_positions: BTreeMap::new(),
            board: Board::seeded(n),
            editing: None,
            history: History::new(n),
        })
    }

    /// Planner whose committed stages are those of `plan`.
    pub fn from_plan(plan: Plan, templates: StageTemplates) -> Result<Self, SessionError> {
        let mut planner = Self::new(plan.n, templates)?;
        planner.module_name = plan.module_name;
        planner.pp_positions = plan.pp_positions;
        planner.committed = plan.stages;
        planner.rebuild_history();
        Ok(planner)
    }

    pub fn width(&self) -> usize {
        self.n
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn committed(&self) -> &[Stage] {
        &self.committed
    }

    pub fn editing(&self) -> Option<&EditingStage> {
        self.editing.as_ref()
    }

    pub fn set_module_name(&mut self, name: Option<String>) {
        self.module_name = name;
    }

    pub fn state(&self) -> SessionState {
        match &self.editing {
            Some(e) => SessionState::Editing {
                stage: e.stage.name.clone(),
            },
            None => SessionState::Idle,
        }
    }

    /// The plan as it stands: committed stages plus the editing stage.
    pub fn to_plan(&self) -> Plan {
        let mut stages = self.committed.clone();
        if let Some(editing) = &self.editing {
            stages.push(editing.stage.clone());
        }
        Plan {
            n: self.n,
            module_name: self.module_name.clone(),
            stages,
            pp_positions: self.pp_positions.clone(),
        }
    }

    /// First unused `{prefix}{k}` name, starting at 1.
    pub fn next_stage_name(&self) -> String {
        (1..)
            .map(|k| format!("{}{}", self.templates.stage_prefix, k))
            .find(|name| !self.name_taken(name))
            .unwrap_or_default()
    }

    fn name_taken(&self, name: &str) -> bool {
        self.committed.iter().any(|s| s.name == name)
            || self.editing.as_ref().is_some_and(|e| e.stage.name == name)
    }

    pub fn execute(&mut self, command: Command) -> Result<Outcome, SessionError> {
        match command {
            Command::OpenStage { name } => self.open_stage(name),
            Command::PlaceAdder(placement) => {
                let applied = self.place(placement)?;
                Ok(Outcome::Placed {
                    applied: vec![applied],
                    skipped: Vec::new(),
                })
            }
            Command::PlaceBatch {
                mode,
                column,
                labels,
                pad,
            } => self.place_batch(mode, column, &labels, pad),
            Command::Reposition { label, y } => self.reposition(label, y),
            Command::Undo => self.undo().map(Outcome::Undone),
            Command::Redo => self.redo().map(Outcome::Redone),
            Command::CommitStage => self.commit(),
            Command::DiscardStage => self.discard(),
            Command::ReopenStage { name, confirmed } => self.reopen(&name, confirmed),
            Command::DeleteStage { name } => self.delete(&name),
            Command::Rebuild { n } => self.rebuild(n),
            Command::Reset => self.reset(),
        }
    }

    fn editing_mut(&mut self) -> Result<&mut EditingStage, SessionError> {
        self.editing.as_mut().ok_or(SessionError::NotEditing)
    }

    fn open_stage(&mut self, name: Option<String>) -> Result<Outcome, SessionError> {
        if let Some(editing) = &self.editing {
            return Err(SessionError::AlreadyEditing {
                stage: editing.stage.name.clone(),
            });
        }
        let name = name.unwrap_or_else(|| self.next_stage_name());
        if self.name_taken(&name) {
            return Err(SessionError::DuplicateStage { name });
        }

        let mut stage = Stage::new(&name);
        stage.ha_name_fmt = self.templates.ha_name_fmt.clone();
        stage.fa_name_fmt = self.templates.fa_name_fmt.clone();
        stage.sum_bus = self.templates.sum_bus.clone();
        stage.carry_bus = self.templates.carry_bus.clone();
        stage.color = Some(PALETTE[self.committed.len() % PALETTE.len()].to_string());

        tracing::info!(stage = %name, "opened stage");
        self.editing = Some(EditingStage::new(stage));
        Ok(Outcome::Opened { stage: name })
    }

    /// Apply one placement to the editing stage and log it.
    fn place(&mut self, placement: Placement) -> Result<Applied, SessionError> {
        let editing = self.editing.as_mut().ok_or(SessionError::NotEditing)?;
        let width_before = self.board.width();
        let applied = apply_placement(
            &mut self.board,
            &editing.stage,
            &mut editing.cursor,
            &placement,
            None,
        );
        editing.stage.placements.push(placement.clone());
        editing.undo.push(Action::Place {
            placement,
            applied: applied.clone(),
            width_before,
        });
        editing.redo.clear();
        Ok(applied)
    }

    fn place_batch(
        &mut self,
        mode: BatchMode,
        column: i64,
        labels: &[String],
        pad: bool,
    ) -> Result<Outcome, SessionError> {
        self.editing_mut()?;
        let groups: Vec<(AdderKind, &[String])> = match mode {
            BatchMode::Smart => match labels.len() {
                2 => vec![(AdderKind::Half, labels)],
                3 => vec![(AdderKind::Full, labels)],
                k => {
                    return Err(SessionError::InvalidBatch(format!(
                        "smart mode needs 2 or 3 labels, got {}",
                        k
                    )));
                }
            },
            BatchMode::Half | BatchMode::Full => {
                let kind = if mode == BatchMode::Full {
                    AdderKind::Full
                } else {
                    AdderKind::Half
                };
                labels
                    .chunks(kind.arity())
                    .map(|chunk| (kind.clone(), chunk))
                    .collect()
            }
        };

        let mut applied = Vec::new();
        let mut skipped = Vec::new();
        for (kind, chunk) in groups {
            if chunk.len() < kind.arity() && !pad {
                tracing::warn!(?chunk, "short {} group left unplaced", kind);
                skipped.push(chunk.to_vec());
                continue;
            }
            let placement = Placement {
                kind,
                column,
                inputs: Some(chunk.to_vec()),
            };
            applied.push(self.place(placement)?);
        }
        Ok(Outcome::Placed { applied, skipped })
    }

    fn reposition(&mut self, label: String, y: f64) -> Result<Outcome, SessionError> {
        let editing = self.editing_mut()?;
        let old = editing.stage.positions.insert(label.clone(), y);
        editing.undo.push(Action::Reposition {
            label: label.clone(),
            old,
            new: y,
        });
        editing.redo.clear();
        Ok(Outcome::Repositioned { label, y })
    }

    /// Revert the most recent action of the editing stage.
    pub fn undo(&mut self) -> Result<Option<Action>, SessionError> {
        let editing = self.editing.as_mut().ok_or(SessionError::NotEditing)?;
        let Some(action) = editing.undo.pop() else {
            return Ok(None);
        };
        match &action {
            Action::Place {
                applied,
                width_before,
                ..
            } => {
                if let Some(carry_column) = applied.column.checked_add(1)
                    && applied.carry_written
                {
                    remove_output(&mut self.board, carry_column, &applied.carry);
                }
                if applied.sum_written {
                    remove_output(&mut self.board, applied.column, &applied.sum);
                }
                for taken in applied.consumed.iter().rev() {
                    self.board.reinstate(taken.clone());
                }
                self.board.shrink_to(*width_before);
                editing.cursor.retreat(&applied.kind);
                editing.stage.placements.pop();
            }
            Action::Reposition { label, old, .. } => match old {
                Some(y) => {
                    editing.stage.positions.insert(label.clone(), *y);
                }
                None => {
                    editing.stage.positions.remove(label);
                }
            },
        }
        tracing::debug!(action = %action, "undo");
        editing.redo.push(action.clone());
        Ok(Some(action))
    }

    /// Re-apply the most recently undone action.
    ///
    /// Placements re-run against the restored board with their original
    /// output labels and instance name.
    pub fn redo(&mut self) -> Result<Option<Action>, SessionError> {
        let editing = self.editing.as_mut().ok_or(SessionError::NotEditing)?;
        let Some(action) = editing.redo.pop() else {
            return Ok(None);
        };
        let action = match action {
            Action::Place {
                placement, applied, ..
            } => {
                let forced = ForcedLabels {
                    sum: applied.sum,
                    carry: applied.carry,
                    instance: applied.instance,
                };
                let width_before = self.board.width();
                let applied = apply_placement(
                    &mut self.board,
                    &editing.stage,
                    &mut editing.cursor,
                    &placement,
                    Some(&forced),
                );
                editing.stage.placements.push(placement.clone());
                Action::Place {
                    placement,
                    applied,
                    width_before,
                }
            }
            Action::Reposition { label, old, new } => {
                editing.stage.positions.insert(label.clone(), new);
                Action::Reposition { label, old, new }
            }
        };
        tracing::debug!(action = %action, "redo");
        editing.undo.push(action.clone());
        Ok(Some(action))
    }

    fn commit(&mut self) -> Result<Outcome, SessionError> {
        let editing = self.editing.take().ok_or(SessionError::NotEditing)?;
        let name = editing.stage.name.clone();
        self.committed.push(editing.stage);
        self.rebuild_history();
        tracing::info!(stage = %name, committed = self.committed.len(), "committed stage");
        Ok(Outcome::Committed { stage: name })
    }

    fn discard(&mut self) -> Result<Outcome, SessionError> {
        let editing = self.editing.take().ok_or(SessionError::NotEditing)?;
        self.board = self.history.final_board().clone();
        tracing::info!(stage = %editing.stage.name, "discarded stage");
        Ok(Outcome::Discarded {
            stage: editing.stage.name,
        })
    }

    fn reopen(&mut self, name: &str, confirmed: bool) -> Result<Outcome, SessionError> {
        if let Some(editing) = &self.editing {
            return Err(SessionError::AlreadyEditing {
                stage: editing.stage.name.clone(),
            });
        }
        let idx = self
            .committed
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| SessionError::UnknownStage {
                name: name.to_string(),
            })?;
        let later = self.committed.len() - idx - 1;
        if later > 0 && !confirmed {
            return Err(SessionError::ConfirmationRequired {
                stage: name.to_string(),
                discarded: later,
            });
        }

        let mut removed = self.committed.split_off(idx);
        let stage = removed.remove(0);
        let discarded: Vec<String> = removed.into_iter().map(|s| s.name).collect();
        self.rebuild_history();

        let placements = stage.placements.clone();
        self.editing = Some(EditingStage::new(Stage {
            placements: Vec::new(),
            ..stage
        }));
        for placement in placements {
            self.place(placement)?;
        }

        tracing::info!(stage = %name, discarded = discarded.len(), "reopened stage");
        Ok(Outcome::Reopened {
            stage: name.to_string(),
            discarded,
        })
    }

    fn delete(&mut self, name: &str) -> Result<Outcome, SessionError> {
        if self.editing.as_ref().is_some_and(|e| e.stage.name == name) {
            self.discard()?;
            return Ok(Outcome::Deleted {
                removed: vec![name.to_string()],
            });
        }
        let idx = self
            .committed
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| SessionError::UnknownStage {
                name: name.to_string(),
            })?;

        let mut removed: Vec<String> = self
            .committed
            .split_off(idx)
            .into_iter()
            .map(|s| s.name)
            .collect();
        if let Some(editing) = self.editing.take() {
            removed.push(editing.stage.name);
        }
        self.rebuild_history();
        tracing::info!(?removed, "deleted stages");
        Ok(Outcome::Deleted { removed })
    }

    fn rebuild(&mut self, n: usize) -> Result<Outcome, SessionError> {
        let mut fresh = Self::new(n, self.templates.clone())?;
        fresh.module_name = self.module_name.take();
        *self = fresh;
        tracing::info!(n, "rebuilt planner");
        Ok(Outcome::Rebuilt { n })
    }

    fn reset(&mut self) -> Result<Outcome, SessionError> {
        self.rebuild_history();
        if let Some(mut editing) = self.editing.take() {
            let placements = std::mem::take(&mut editing.stage.placements);
            self.editing = Some(EditingStage::new(editing.stage));
            for placement in placements {
                self.place(placement)?;
            }
        }
        Ok(Outcome::Reset)
    }

    /// Replay committed stages and move the live board to the result.
    fn rebuild_history(&mut self) {
        self.history.refresh(self.n, &self.committed);
        self.board = self.history.final_board().clone();
    }
}

/// Remove a just-written output label, preferring the top of its column.
fn remove_output(board: &mut Board, column: i64, label: &str) {
    let Ok(column) = usize::try_from(column) else {
        return;
    };
    let on_top = board
        .column(column)
        .last()
        .is_some_and(|bit| bit.label == label);
    if on_top {
        board.pop_top(column);
    } else if board.take_from_column(column, label).is_none() {
        tracing::warn!(label, column, "output label not found while undoing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{GenerateOptions, generate};

    fn planner(n: usize) -> Planner {
        Planner::new(n, StageTemplates::default()).unwrap()
    }

    fn open(p: &mut Planner) -> String {
        match p.execute(Command::OpenStage { name: None }).unwrap() {
            Outcome::Opened { stage } => stage,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    fn place(p: &mut Planner, placement: Placement) {
        p.execute(Command::PlaceAdder(placement)).unwrap();
    }

    #[test]
    fn test_lifecycle_states() {
        let mut p = planner(4);
        assert_eq!(p.state(), SessionState::Idle);
        assert!(matches!(
            p.execute(Command::PlaceAdder(Placement::half(1))),
            Err(SessionError::NotEditing)
        ));

        let name = open(&mut p);
        assert_eq!(name, "stg1");
        assert_eq!(p.state(), SessionState::Editing { stage: "stg1".into() });
        assert!(matches!(
            p.execute(Command::OpenStage { name: None }),
            Err(SessionError::AlreadyEditing { .. })
        ));

        p.execute(Command::CommitStage).unwrap();
        assert_eq!(p.state(), SessionState::Idle);
        assert_eq!(open(&mut p), "stg2");
    }

    #[test]
    fn test_duplicate_stage_name_is_rejected() {
        let mut p = planner(2);
        p.execute(Command::OpenStage {
            name: Some("a".into()),
        })
        .unwrap();
        p.execute(Command::CommitStage).unwrap();
        assert!(matches!(
            p.execute(Command::OpenStage {
                name: Some("a".into())
            }),
            Err(SessionError::DuplicateStage { .. })
        ));
    }

    #[test]
    fn test_undo_redo_round_trip_is_exact() {
        let mut p = planner(4);
        open(&mut p);
        place(&mut p, Placement::full(3));
        let before_board = p.board().clone();
        let before_cursor = p.editing().unwrap().cursor;

        place(&mut p, Placement::half(2).with_inputs(["pp0[2]", "pp2[0]"]));
        let after_board = p.board().clone();
        let after_cursor = p.editing().unwrap().cursor;

        assert!(p.undo().unwrap().is_some());
        assert_eq!(p.board(), &before_board);
        assert_eq!(p.editing().unwrap().cursor, before_cursor);
        assert_eq!(p.editing().unwrap().stage.placements.len(), 1);

        assert!(p.redo().unwrap().is_some());
        assert_eq!(p.board(), &after_board);
        assert_eq!(p.editing().unwrap().cursor, after_cursor);
        assert!(p.board().contains("stg1_S[1]"));
    }

    #[test]
    fn test_undo_restores_board_growth() {
        let mut p = planner(2);
        open(&mut p);
        place(&mut p, Placement::half(9));
        assert_eq!(p.board().width(), 11);
        p.undo().unwrap();
        assert_eq!(p.board(), &Board::seeded(2));
    }

    #[test]
    fn test_undo_redo_of_unreachable_column() {
        let mut p = planner(2);
        open(&mut p);
        place(&mut p, Placement::half(i64::MAX));
        assert_eq!(p.board(), &Board::seeded(2));

        p.undo().unwrap();
        assert_eq!(p.board(), &Board::seeded(2));
        p.redo().unwrap();
        assert_eq!(p.board(), &Board::seeded(2));
        assert_eq!(p.editing().unwrap().undo_depth(), 1);
    }

    #[test]
    fn test_empty_undo_and_redo_are_noops() {
        let mut p = planner(2);
        open(&mut p);
        assert_eq!(p.undo().unwrap(), None);
        assert_eq!(p.redo().unwrap(), None);
    }

    #[test]
    fn test_new_action_clears_redo() {
        let mut p = planner(4);
        open(&mut p);
        place(&mut p, Placement::full(3));
        p.undo().unwrap();
        assert_eq!(p.editing().unwrap().redo_depth(), 1);
        place(&mut p, Placement::half(2));
        assert_eq!(p.editing().unwrap().redo_depth(), 0);
        assert_eq!(p.redo().unwrap(), None);
    }

    #[test]
    fn test_reposition_undo_redo_leaves_board_alone() {
        let mut p = planner(2);
        open(&mut p);
        let board = p.board().clone();
        p.execute(Command::Reposition {
            label: "pp0[1]".into(),
            y: -30.0,
        })
        .unwrap();
        assert_eq!(
            p.editing().unwrap().stage.positions.get("pp0[1]"),
            Some(&-30.0)
        );
        p.undo().unwrap();
        assert!(p.editing().unwrap().stage.positions.is_empty());
        p.redo().unwrap();
        assert_eq!(
            p.editing().unwrap().stage.positions.get("pp0[1]"),
            Some(&-30.0)
        );
        assert_eq!(p.board(), &board);
        assert_eq!(p.editing().unwrap().cursor, StageCursor::default());
    }

    #[test]
    fn test_discard_restores_last_committed_board() {
        let mut p = planner(4);
        open(&mut p);
        place(&mut p, Placement::full(3));
        p.execute(Command::CommitStage).unwrap();
        let committed = p.board().clone();

        open(&mut p);
        place(&mut p, Placement::full(4));
        place(&mut p, Placement::half(2));
        p.execute(Command::DiscardStage).unwrap();
        assert_eq!(p.board(), &committed);
        assert_eq!(p.committed().len(), 1);
    }

    #[test]
    fn test_reopen_requires_confirmation_and_changes_nothing() {
        let mut p = planner(4);
        for col in [3, 4, 5] {
            open(&mut p);
            place(&mut p, Placement::full(col));
            p.execute(Command::CommitStage).unwrap();
        }
        let board = p.board().clone();

        let err = p
            .execute(Command::ReopenStage {
                name: "stg1".into(),
                confirmed: false,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::ConfirmationRequired { discarded: 2, .. }
        ));
        assert_eq!(p.committed().len(), 3);
        assert_eq!(p.board(), &board);
        assert_eq!(p.state(), SessionState::Idle);
    }

    #[test]
    fn test_reopen_replays_earlier_stages_and_own_placements() {
        let mut p = planner(4);
        for col in [3, 4] {
            open(&mut p);
            place(&mut p, Placement::full(col));
            p.execute(Command::CommitStage).unwrap();
        }
        let after_first = p.history().board_after(1).clone();

        let outcome = p
            .execute(Command::ReopenStage {
                name: "stg2".into(),
                confirmed: false,
            })
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Reopened {
                stage: "stg2".into(),
                discarded: vec![]
            }
        );
        assert_eq!(p.committed().len(), 1);
        assert_eq!(p.editing().unwrap().undo_depth(), 1);

        // undoing the replayed placement lands on the first stage's result
        p.undo().unwrap();
        assert_eq!(p.board(), &after_first);
    }

    #[test]
    fn test_reopen_confirmed_truncates_later_stages() {
        let mut p = planner(4);
        for col in [3, 4, 5] {
            open(&mut p);
            place(&mut p, Placement::full(col));
            p.execute(Command::CommitStage).unwrap();
        }
        let outcome = p
            .execute(Command::ReopenStage {
                name: "stg1".into(),
                confirmed: true,
            })
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Reopened {
                stage: "stg1".into(),
                discarded: vec!["stg2".into(), "stg3".into()]
            }
        );
        assert!(p.committed().is_empty());
        assert_eq!(p.history().len(), 0);
        assert_eq!(p.editing().unwrap().stage.placements.len(), 1);
    }

    #[test]
    fn test_delete_drops_stage_and_followers() {
        let mut p = planner(4);
        for col in [3, 4, 5] {
            open(&mut p);
            place(&mut p, Placement::full(col));
            p.execute(Command::CommitStage).unwrap();
        }
        open(&mut p);
        let outcome = p
            .execute(Command::DeleteStage {
                name: "stg2".into(),
            })
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Deleted {
                removed: vec!["stg2".into(), "stg3".into(), "stg4".into()]
            }
        );
        assert_eq!(p.committed().len(), 1);
        assert_eq!(p.state(), SessionState::Idle);
        assert_eq!(p.board(), p.history().board_after(1));

        assert!(matches!(
            p.execute(Command::DeleteStage {
                name: "ghost".into()
            }),
            Err(SessionError::UnknownStage { .. })
        ));
    }

    #[test]
    fn test_batch_modes() {
        let mut p = planner(4);
        open(&mut p);
        let labels: Vec<String> = ["pp0[3]", "pp1[2]", "pp2[1]", "pp3[0]", "pp0[2]"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let outcome = p
            .execute(Command::PlaceBatch {
                mode: BatchMode::Half,
                column: 3,
                labels: labels.clone(),
                pad: false,
            })
            .unwrap();
        match outcome {
            Outcome::Placed { applied, skipped } => {
                assert_eq!(applied.len(), 2);
                assert_eq!(skipped, vec![vec!["pp0[2]".to_string()]]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(p.editing().unwrap().undo_depth(), 2);

        p.execute(Command::PlaceBatch {
            mode: BatchMode::Full,
            column: 2,
            labels: vec!["pp0[2]".into()],
            pad: true,
        })
        .unwrap();
        let last = p.editing().unwrap().stage.placements.last().unwrap().clone();
        assert_eq!(last.kind, AdderKind::Full);

        assert!(matches!(
            p.execute(Command::PlaceBatch {
                mode: BatchMode::Smart,
                column: 1,
                labels: vec!["pp0[1]".into()],
                pad: false,
            }),
            Err(SessionError::InvalidBatch(_))
        ));
    }

    #[test]
    fn test_batch_mode_parsing() {
        assert_eq!("HA".parse::<BatchMode>().unwrap(), BatchMode::Half);
        assert_eq!("smart".parse::<BatchMode>().unwrap(), BatchMode::Smart);
        assert!("xa".parse::<BatchMode>().is_err());
    }

    #[test]
    fn test_rebuild_reseeds_and_clears() {
        let mut p = planner(4);
        open(&mut p);
        place(&mut p, Placement::full(3));
        p.execute(Command::CommitStage).unwrap();
        p.execute(Command::Rebuild { n: 3 }).unwrap();
        assert_eq!(p.width(), 3);
        assert!(p.committed().is_empty());
        assert_eq!(p.board(), &Board::seeded(3));
        assert!(matches!(
            p.execute(Command::Rebuild { n: 1 }),
            Err(SessionError::InvalidWidth { n: 1 })
        ));
    }

    #[test]
    fn test_reset_rederives_the_same_board() {
        let mut p = planner(4);
        open(&mut p);
        place(&mut p, Placement::full(3));
        p.execute(Command::CommitStage).unwrap();
        open(&mut p);
        place(&mut p, Placement::half(4));
        let board = p.board().clone();
        p.execute(Command::Reset).unwrap();
        assert_eq!(p.board(), &board);
        assert_eq!(p.editing().unwrap().undo_depth(), 1);
    }

    #[test]
    fn test_stage_colors_follow_palette() {
        let mut p = planner(2);
        open(&mut p);
        assert_eq!(
            p.editing().unwrap().stage.color.as_deref(),
            Some(PALETTE[0])
        );
        p.execute(Command::CommitStage).unwrap();
        open(&mut p);
        assert_eq!(
            p.editing().unwrap().stage.color.as_deref(),
            Some(PALETTE[1])
        );
    }

    #[test]
    fn test_interactive_plan_matches_batch_generation() {
        let mut p = planner(4);
        open(&mut p);
        place(&mut p, Placement::full(3));
        place(&mut p, Placement::full(4));
        place(&mut p, Placement::half(2));
        p.undo().unwrap();
        p.redo().unwrap();
        p.execute(Command::CommitStage).unwrap();
        open(&mut p);
        place(&mut p, Placement::full(4));
        place(&mut p, Placement::half(5));
        p.execute(Command::CommitStage).unwrap();

        let plan = p.to_plan();
        let batch = generate(&plan);
        assert_eq!(p.board(), &batch.board);
        assert_eq!(
            p.history().render(&plan, GenerateOptions::default()),
            batch.text
        );
    }

    #[test]
    fn test_live_editing_board_matches_batch_of_to_plan() {
        let mut p = planner(4);
        open(&mut p);
        place(&mut p, Placement::full(3));
        place(&mut p, Placement::half(4).with_inputs(["pp1[3]", "stg1_C[0]"]));
        assert_eq!(p.board(), &generate(&p.to_plan()).board);
    }

    #[test]
    fn test_from_plan_replays_committed_stages() {
        let plan = Plan::new(4).with_stages(vec![
            Stage::new("x").with_placements(vec![Placement::full(3)]),
        ]);
        let p = Planner::from_plan(plan.clone(), StageTemplates::default()).unwrap();
        assert_eq!(p.history().len(), 1);
        assert_eq!(p.board(), &generate(&plan).board);
        assert_eq!(p.to_plan(), plan);
    }
}
