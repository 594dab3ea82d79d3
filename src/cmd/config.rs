//! Configuration view and validation commands: `wallace config`.

use anyhow::Result;

use super::super::{Cli, ConfigCommands};

fn print_toml(toml: &wallace::config::PlannerToml) {
    let d = &toml.defaults;
    println!("[defaults]");
    println!("  width = {}", d.width);
    println!("  module_name = \"{}\"", d.module_name);
    println!("  ha_name_fmt = \"{}\"", d.ha_name_fmt);
    println!("  fa_name_fmt = \"{}\"", d.fa_name_fmt);
    println!("  sum_bus = \"{}\"", d.sum_bus);
    println!("  carry_bus = \"{}\"", d.carry_bus);
    println!("  stage_prefix = \"{}\"", d.stage_prefix);
    println!();
    println!("[output]");
    println!("  embed_warnings = {}", toml.output.embed_warnings);
    println!();
}

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    use wallace::config::{CONFIG_FILE, PlannerToml};

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| std::path::PathBuf::from(CONFIG_FILE));

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Planner Configuration");
            println!("=====================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                PlannerToml::load(&config_path)?
            } else {
                println!("No planner.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                PlannerToml::default()
            };
            print_toml(&toml);

            println!("Effective values (with env overrides):");
            println!("  width = {}", toml.width());
            println!("  module_name = \"{}\"", toml.module_template());
            println!();
            if !config_path.exists() {
                println!("Run 'wallace config init' to create a planner.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No planner.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = PlannerToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("planner.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }

            PlannerToml::default().save(&config_path)?;

            println!("Created planner.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [defaults] width, module_name, naming templates, stage_prefix");
            println!("  - [output] embed_warnings");
            println!();
        }
    }

    Ok(())
}
