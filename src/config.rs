//! Planner configuration.
//!
//! Settings are read from `planner.toml` and layered file → environment →
//! CLI. Every key is optional; a missing file yields the defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [defaults]
//! width = 32
//! module_name = "WallaceTree{n}x{n}"
//! ha_name_fmt = "{stage}ha{idx}"
//! fa_name_fmt = "{stage}fa{idx}"
//! sum_bus = "{stage}_S"
//! carry_bus = "{stage}_C"
//! stage_prefix = "stg"
//!
//! [output]
//! embed_warnings = true
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::generate::GenerateOptions;
use crate::plan::{DEFAULT_CARRY_BUS, DEFAULT_FA_NAME_FMT, DEFAULT_HA_NAME_FMT, DEFAULT_SUM_BUS};
use crate::session::StageTemplates;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "planner.toml";

/// Environment override for `defaults.width`.
pub const ENV_WIDTH: &str = "WALLACE_WIDTH";
/// Environment override for `defaults.module_name`.
pub const ENV_MODULE: &str = "WALLACE_MODULE";

/// Defaults for new plans and stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Width N used when no plan is given
    #[serde(default = "default_width")]
    pub width: usize,
    /// Module name template; `{n}` is replaced with the width
    #[serde(default = "default_module_name")]
    pub module_name: String,
    #[serde(default = "default_ha_name_fmt")]
    pub ha_name_fmt: String,
    #[serde(default = "default_fa_name_fmt")]
    pub fa_name_fmt: String,
    #[serde(default = "default_sum_bus")]
    pub sum_bus: String,
    #[serde(default = "default_carry_bus")]
    pub carry_bus: String,
    /// Prefix for auto-named interactive stages
    #[serde(default = "default_stage_prefix")]
    pub stage_prefix: String,
}

fn default_width() -> usize {
    32
}

fn default_module_name() -> String {
    "WallaceTree{n}x{n}".to_string()
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

fn default_stage_prefix() -> String {
    "stg".to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            module_name: default_module_name(),
            ha_name_fmt: default_ha_name_fmt(),
            fa_name_fmt: default_fa_name_fmt(),
            sum_bus: default_sum_bus(),
            carry_bus: default_carry_bus(),
            stage_prefix: default_stage_prefix(),
        }
    }
}

/// Generated-text settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Append the warnings comment block to generated modules
    #[serde(default = "default_embed_warnings")]
    pub embed_warnings: bool,
}

fn default_embed_warnings() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            embed_warnings: default_embed_warnings(),
        }
    }
}

/// The complete planner.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerToml {
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl PlannerToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse planner.toml")
    }

    /// Load `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize planner.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Default width, with `WALLACE_WIDTH` taking precedence.
    pub fn width(&self) -> usize {
        match std::env::var(ENV_WIDTH) {
            Ok(value) => value.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %value, "ignoring non-numeric {}", ENV_WIDTH);
                self.defaults.width
            }),
            Err(_) => self.defaults.width,
        }
    }

    /// Module name template, with `WALLACE_MODULE` taking precedence.
    pub fn module_template(&self) -> String {
        std::env::var(ENV_MODULE).unwrap_or_else(|_| self.defaults.module_name.clone())
    }

    /// Module name for width `n`.
    pub fn module_name_for(&self, n: usize) -> String {
        self.module_template().replace("{n}", &n.to_string())
    }

    pub fn templates(&self) -> StageTemplates {
        StageTemplates {
            ha_name_fmt: self.defaults.ha_name_fmt.clone(),
            fa_name_fmt: self.defaults.fa_name_fmt.clone(),
            sum_bus: self.defaults.sum_bus.clone(),
            carry_bus: self.defaults.carry_bus.clone(),
            stage_prefix: self.defaults.stage_prefix.clone(),
        }
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            embed_warnings: self.output.embed_warnings,
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let d = &self.defaults;

        if d.width < 2 {
            warnings.push(format!("Invalid width {}: must be at least 2", d.width));
        }
        if d.module_name.trim().is_empty() {
            warnings.push("module_name is empty".to_string());
        }
        for (key, template) in [("ha_name_fmt", &d.ha_name_fmt), ("fa_name_fmt", &d.fa_name_fmt)] {
            if !template.contains("{idx}") {
                warnings.push(format!(
                    "{} '{}' has no {{idx}} placeholder: instance names will collide",
                    key, template
                ));
            }
            if !template.contains("{stage}") {
                warnings.push(format!(
                    "{} '{}' has no {{stage}} placeholder: names may collide across stages",
                    key, template
                ));
            }
        }
        for (key, template) in [("sum_bus", &d.sum_bus), ("carry_bus", &d.carry_bus)] {
            if !template.contains("{stage}") {
                warnings.push(format!(
                    "{} '{}' has no {{stage}} placeholder: buses will collide across stages",
                    key, template
                ));
            }
        }
        if d.sum_bus == d.carry_bus {
            warnings.push(format!(
                "sum_bus and carry_bus are both '{}'",
                d.sum_bus
            ));
        }
        if d.stage_prefix.is_empty() {
            warnings.push("stage_prefix is empty".to_string());
        }

        warnings
    }
}

/// Resolved configuration with CLI overrides.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Where the config was (or would be) read from
    pub path: PathBuf,
    pub toml: PlannerToml,
    /// CLI override: debug logging
    pub verbose: bool,
    /// CLI override: auto-confirm gates
    pub yes: bool,
}

impl PlannerConfig {
    /// Load `path`, or `./planner.toml` when none is given.
    pub fn with_cli_args(path: Option<PathBuf>, verbose: bool, yes: bool) -> Result<Self> {
        let path = path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        let toml = PlannerToml::load_or_default(&path)?;
        Ok(Self {
            path,
            toml,
            verbose,
            yes,
        })
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
