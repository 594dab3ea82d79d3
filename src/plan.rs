//! Plan data model and JSON loading for the reduction planner.
//!
//! This module provides:
//! - `Placement`, one half/full adder dropped on a column
//! - `Stage`, an ordered batch of placements with its naming templates
//! - `Plan`, the persisted artifact: width, module name and ordered stages
//! - Loading and saving of the plan file format

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::PlanError;

pub const DEFAULT_HA_NAME_FMT: &str = "{stage}ha{idx}";
pub const DEFAULT_FA_NAME_FMT: &str = "{stage}fa{idx}";
pub const DEFAULT_SUM_BUS: &str = "{stage}_S";
pub const DEFAULT_CARRY_BUS: &str = "{stage}_C";

/// Adder type of a placement.
///
/// Parsed case-insensitively. Anything other than HA/FA is kept verbatim
/// so the engine can report it instead of the loader rejecting the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AdderKind {
    Half,
    Full,
    Unknown(String),
}

impl AdderKind {
    /// Number of inputs the adder consumes.
    pub fn arity(&self) -> usize {
        match self {
            AdderKind::Full => 3,
            _ => 2,
        }
    }
}

impl From<String> for AdderKind {
    fn from(s: String) -> Self {
        match s.to_uppercase().as_str() {
            "HA" => AdderKind::Half,
            "FA" => AdderKind::Full,
            _ => AdderKind::Unknown(s),
        }
    }
}

impl From<AdderKind> for String {
    fn from(kind: AdderKind) -> Self {
        kind.to_string()
    }
}

impl std::fmt::Display for AdderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdderKind::Half => write!(f, "HA"),
            AdderKind::Full => write!(f, "FA"),
            AdderKind::Unknown(s) => write!(f, "{}", s),
        }
    }
}

impl std::str::FromStr for AdderKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AdderKind::from(s.to_string()))
    }
}

/// One adder dropped on a weighted column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(rename = "type")]
    pub kind: AdderKind,
    /// Target column; may be negative or out of range in hand-written plans.
    #[serde(rename = "col")]
    pub column: i64,
    /// Explicit input labels. `None` pops from the top of the column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,
}

impl Placement {
    pub fn half(column: i64) -> Self {
        Self {
            kind: AdderKind::Half,
            column,
            inputs: None,
        }
    }

    pub fn full(column: i64) -> Self {
        Self {
            kind: AdderKind::Full,
            column,
            inputs: None,
        }
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = Some(inputs.into_iter().map(Into::into).collect());
        self
    }

    /// Explicit inputs, treating an empty list as implicit.
    pub fn explicit_inputs(&self) -> Option<&[String]> {
        self.inputs.as_deref().filter(|inputs| !inputs.is_empty())
    }
}

/// An ordered batch of placements plus the naming templates for its
/// instances and buses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    #[serde(default = "default_ha_name_fmt")]
    pub ha_name_fmt: String,
    #[serde(default = "default_fa_name_fmt")]
    pub fa_name_fmt: String,
    #[serde(default = "default_sum_bus")]
    pub sum_bus: String,
    #[serde(default = "default_carry_bus")]
    pub carry_bus: String,
    #[serde(default, rename = "adders")]
    pub placements: Vec<Placement>,
    /// Presentation colour, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Presentation baseline per column, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<BTreeMap<String, Vec<f64>>>,
    /// Vertical layout positions keyed by label, carried through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub positions: BTreeMap<String, f64>,
}

fn default_ha_name_fmt() -> String {
    DEFAULT_HA_NAME_FMT.to_string()
}

fn default_fa_name_fmt() -> String {
    DEFAULT_FA_NAME_FMT.to_string()
}

fn default_sum_bus() -> String {
    DEFAULT_SUM_BUS.to_string()
}

fn default_carry_bus() -> String {
    DEFAULT_CARRY_BUS.to_string()
}

impl Stage {
    /// Create a stage with the default naming templates.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ha_name_fmt: default_ha_name_fmt(),
            fa_name_fmt: default_fa_name_fmt(),
            sum_bus: default_sum_bus(),
            carry_bus: default_carry_bus(),
            placements: Vec::new(),
            color: None,
            baseline: None,
            positions: BTreeMap::new(),
        }
    }

    pub fn with_placements(mut self, placements: Vec<Placement>) -> Self {
        self.placements = placements;
        self
    }

    /// Sum bus name with `{stage}` substituted.
    pub fn sum_bus_name(&self) -> String {
        render_bus(&self.sum_bus, &self.name)
    }

    /// Carry bus name with `{stage}` substituted.
    pub fn carry_bus_name(&self) -> String {
        render_bus(&self.carry_bus, &self.name)
    }

    /// Instance name for the `idx`-th adder of `kind` in this stage.
    pub fn instance_name(&self, kind: &AdderKind, idx: usize) -> String {
        let template = match kind {
            AdderKind::Full => &self.fa_name_fmt,
            _ => &self.ha_name_fmt,
        };
        render_instance(template, &self.name, idx)
    }
}

/// Substitute `{stage}` only; bus templates carry no index.
pub fn render_bus(template: &str, stage: &str) -> String {
    template.replace("{stage}", stage)
}

/// Substitute `{stage}` and `{idx}`.
pub fn render_instance(template: &str, stage: &str, idx: usize) -> String {
    template
        .replace("{stage}", stage)
        .replace("{idx}", &idx.to_string())
}

/// Default module name for width `n`.
pub fn default_module_name(n: usize) -> String {
    format!("WallaceTree{}x{}", n, n)
}

/// The persisted reduction plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "N")]
    pub n: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    #[serde(default)]
    pub stages: Vec<Stage>,
    /// Layout positions of partial products, carried through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pp_positions: BTreeMap<String, f64>,
}

impl Plan {
    /// Empty plan of width `n`.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            module_name: None,
            stages: Vec::new(),
            pp_positions: BTreeMap::new(),
        }
    }

    pub fn with_stages(mut self, stages: Vec<Stage>) -> Self {
        self.stages = stages;
        self
    }

    /// Output width W = 2N.
    pub fn output_width(&self) -> usize {
        2 * self.n
    }

    /// Module name, falling back to `WallaceTree{N}x{N}`.
    pub fn module_name(&self) -> String {
        self.module_name
            .clone()
            .unwrap_or_else(|| default_module_name(self.n))
    }

    pub fn get_stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn stage_index(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name == name)
    }

    /// Parse a plan from JSON text. `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self, PlanError> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|source| PlanError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if !value.get("N").is_some_and(serde_json::Value::is_u64) {
            return Err(PlanError::MissingWidth {
                path: path.to_path_buf(),
            });
        }

        let plan: Plan = serde_json::from_value(value).map_err(|source| PlanError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if plan.n < 2 {
            return Err(PlanError::InvalidWidth { n: plan.n });
        }
        Ok(plan)
    }

    /// Load a plan from a JSON file.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Load a plan and check it against an explicitly requested width.
    pub fn load_with_width(path: &Path, requested: Option<usize>) -> Result<Self, PlanError> {
        let plan = Self::load(path)?;
        match requested {
            Some(requested) if requested != plan.n => Err(PlanError::WidthMismatch {
                requested,
                found: plan.n,
            }),
            _ => Ok(plan),
        }
    }

    /// Save the plan as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), PlanError> {
        let write_err = |source| PlanError::Write {
            path: path.to_path_buf(),
            source,
        };
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, content).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample_plan_json() -> String {
        r##"{
            "N": 4,
            "module_name": "Tree4",
            "stages": [
                {
                    "name": "s1",
                    "adders": [
                        {"type": "FA", "col": 3},
                        {"type": "ha", "col": 2, "inputs": ["pp0[2]", "pp1[1]"]}
                    ]
                },
                {
                    "name": "s2",
                    "ha_name_fmt": "h_{stage}_{idx}",
                    "sum_bus": "{stage}sum",
                    "color": "#1E88E5",
                    "positions": {"s2sum[0]": -22.0},
                    "adders": []
                }
            ]
        }"##
        .to_string()
    }

    #[test]
    fn test_parse_defaults_and_fields() {
        let plan = Plan::parse(&sample_plan_json(), Path::new("plan.json")).unwrap();
        assert_eq!(plan.n, 4);
        assert_eq!(plan.module_name(), "Tree4");
        assert_eq!(plan.stages.len(), 2);

        let s1 = &plan.stages[0];
        assert_eq!(s1.ha_name_fmt, DEFAULT_HA_NAME_FMT);
        assert_eq!(s1.carry_bus, DEFAULT_CARRY_BUS);
        assert_eq!(s1.placements[0].kind, AdderKind::Full);
        assert!(s1.placements[0].inputs.is_none());
        assert_eq!(s1.placements[1].kind, AdderKind::Half);
        assert_eq!(
            s1.placements[1].explicit_inputs().unwrap(),
            &["pp0[2]".to_string(), "pp1[1]".to_string()]
        );

        let s2 = &plan.stages[1];
        assert_eq!(s2.sum_bus_name(), "s2sum");
        assert_eq!(s2.instance_name(&AdderKind::Half, 3), "h_s2_3");
        assert_eq!(s2.color.as_deref(), Some("#1E88E5"));
        assert_eq!(s2.positions.get("s2sum[0]"), Some(&-22.0));
    }

    #[test]
    fn test_module_name_defaults_to_width() {
        let plan = Plan::parse(r#"{"N": 8}"#, Path::new("p.json")).unwrap();
        assert_eq!(plan.module_name(), "WallaceTree8x8");
        assert!(plan.stages.is_empty());
        assert_eq!(plan.output_width(), 16);
    }

    #[test]
    fn test_unknown_adder_type_is_kept() {
        let json = r#"{"N": 2, "stages": [{"name": "s", "adders": [{"type": "XA", "col": 1}]}]}"#;
        let plan = Plan::parse(json, Path::new("p.json")).unwrap();
        assert_eq!(
            plan.stages[0].placements[0].kind,
            AdderKind::Unknown("XA".to_string())
        );
    }

    #[test]
    fn test_missing_width_is_rejected() {
        let err = Plan::parse(r#"{"stages": []}"#, Path::new("p.json")).unwrap_err();
        assert!(matches!(err, PlanError::MissingWidth { .. }));

        let err = Plan::parse(r#"{"N": "eight"}"#, Path::new("p.json")).unwrap_err();
        assert!(matches!(err, PlanError::MissingWidth { .. }));
    }

    #[test]
    fn test_tiny_width_is_rejected() {
        let err = Plan::parse(r#"{"N": 1}"#, Path::new("p.json")).unwrap_err();
        assert!(matches!(err, PlanError::InvalidWidth { n: 1 }));
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let err = Plan::parse("{ not json", Path::new("p.json")).unwrap_err();
        assert!(matches!(err, PlanError::Parse { .. }));
        assert!(err.to_string().contains("Failed to parse plan JSON"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Plan::load(Path::new("/nonexistent/plan.json")).unwrap_err();
        assert!(matches!(err, PlanError::Read { .. }));
    }

    #[test]
    fn test_load_with_width_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");
        fs::write(&path, sample_plan_json()).unwrap();

        assert!(Plan::load_with_width(&path, Some(4)).is_ok());
        assert!(Plan::load_with_width(&path, None).is_ok());
        let err = Plan::load_with_width(&path, Some(8)).unwrap_err();
        assert!(matches!(
            err,
            PlanError::WidthMismatch {
                requested: 8,
                found: 4
            }
        ));
    }

    #[test]
    fn test_save_then_load_preserves_presentation_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("plan.json");
        let mut plan = Plan::parse(&sample_plan_json(), Path::new("plan.json")).unwrap();
        plan.pp_positions.insert("pp0[0]".into(), -44.0);

        plan.save(&path).unwrap();
        let loaded = Plan::load(&path).unwrap();
        assert_eq!(loaded, plan);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"adders\""));
        assert!(raw.contains("\"col\""));
        assert!(raw.contains("\"type\": \"FA\""));
    }

    #[test]
    fn test_render_templates() {
        assert_eq!(render_bus("{stage}_S", "stg1"), "stg1_S");
        assert_eq!(render_instance("{stage}fa{idx}", "stg1", 4), "stg1fa4");
        assert_eq!(render_bus("{stage}_{idx}", "a"), "a_{idx}");
    }
}
