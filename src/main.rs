use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wallace::config::PlannerConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "wallace")]
#[command(version, about = "Wallace-tree reduction planner")]
pub struct Cli {
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to every confirmation gate
    #[arg(long, global = true)]
    pub yes: bool,

    /// Path to planner.toml (defaults to ./planner.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the reduction module from a plan (batch mode)
    Generate {
        /// Plan file (JSON). Without it an empty plan of width N is generated
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Width N; must match the plan's N when both are given
        #[arg(short, long)]
        n: Option<usize>,

        /// Override the module name
        #[arg(long)]
        module: Option<String>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the seeded partial-product board
    Seed {
        #[arg(short, long)]
        n: Option<usize>,
    },
    /// Replay a plan and print its stage-by-stage audit trail
    History {
        #[arg(long)]
        plan: PathBuf,

        /// Only show this stage
        #[arg(long)]
        stage: Option<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Build a plan interactively, one stage at a time
    Plan {
        /// Start from an existing plan file
        #[arg(long)]
        plan: Option<PathBuf>,

        #[arg(short, long)]
        n: Option<usize>,

        /// Read planner commands from a file instead of stdin
        #[arg(long)]
        script: Option<PathBuf>,

        /// Save the plan here on exit
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default planner.toml file
    Init,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<PlannerConfig> {
    PlannerConfig::with_cli_args(cli.config.clone(), cli.verbose, cli.yes)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Generate {
            plan,
            n,
            module,
            out,
        } => cmd::cmd_generate(
            &load_config(&cli)?,
            plan.as_deref(),
            *n,
            module.as_deref(),
            out.as_deref(),
        )?,
        Commands::Seed { n } => cmd::cmd_seed(&load_config(&cli)?, *n)?,
        Commands::History { plan, stage, json } => {
            cmd::cmd_history(plan, stage.as_deref(), *json)?
        }
        Commands::Plan {
            plan,
            n,
            script,
            save,
        } => cmd::cmd_plan(
            &load_config(&cli)?,
            plan.as_deref(),
            *n,
            script.as_deref(),
            save.as_deref(),
        )?,
        Commands::Config { command } => cmd::cmd_config(&cli, command.clone())?,
    }

    Ok(())
}
