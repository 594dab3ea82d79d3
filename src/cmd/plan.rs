//! Interactive planner: `wallace plan`.
//!
//! Reads one command per line from stdin or a script file and drives a
//! [`Planner`]. Lines starting with `#` are ignored.

use anyhow::{Context, Result};
use console::style;
use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;

use wallace::config::PlannerConfig;
use wallace::errors::SessionError;
use wallace::plan::{AdderKind, Placement, Plan};
use wallace::session::{BatchMode, Command, Outcome, Planner};
use wallace::ui::icons::{CHECK, CROSS, REDO, REPLAY, SAVE, STAGE, UNDO, WARN};

const HELP: &str = "\
Commands:
  new [name]                          open a new stage
  ha <col> [labels..]                 place a half adder
  fa <col> [labels..]                 place a full adder
  batch <ha|fa|smart> <col> <labels..> [--pad]
  move <label> <y>                    set a layout position
  undo | redo
  commit | discard
  reopen <stage>                      edit a committed stage again
  delete <stage>                      drop a stage and its followers
  rebuild <n>                         start over with width n
  reset                               re-derive the board by replay
  board | history | preview
  save <file>
  quit";

enum Flow {
    Continue,
    Quit,
}

struct Repl<'a> {
    planner: Planner,
    config: &'a PlannerConfig,
    /// Gates may prompt on the terminal.
    interactive: bool,
}

impl Repl<'_> {
    /// Ask before a destructive step. Without a terminal the answer is
    /// no unless `--yes` was given.
    fn confirm(&self, prompt: &str) -> bool {
        use dialoguer::Confirm;

        if self.config.yes {
            return true;
        }
        if !self.interactive {
            println!("{}{} (declined, pass --yes to confirm)", WARN, prompt);
            return false;
        }
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }

    fn plan(&self) -> Plan {
        let mut plan = self.planner.to_plan();
        let n = plan.n;
        plan.module_name
            .get_or_insert_with(|| self.config.toml.module_name_for(n));
        plan
    }

    fn run(&mut self, command: Command) -> Result<()> {
        let outcome = self.planner.execute(command)?;
        report(&outcome);
        Ok(())
    }

    fn handle(&mut self, line: &str) -> Result<Flow> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, args)) = tokens.split_first() else {
            return Ok(Flow::Continue);
        };
        if head.starts_with('#') {
            return Ok(Flow::Continue);
        }

        match head.to_lowercase().as_str() {
            "new" => self.run(Command::OpenStage {
                name: args.first().map(|s| s.to_string()),
            })?,
            "ha" | "fa" => {
                let (col, labels) = args
                    .split_first()
                    .with_context(|| format!("usage: {} <col> [labels..]", head))?;
                let placement = Placement {
                    kind: AdderKind::from(head.to_string()),
                    column: parse_column(col)?,
                    inputs: (!labels.is_empty())
                        .then(|| labels.iter().map(|s| s.to_string()).collect()),
                };
                self.run(Command::PlaceAdder(placement))?;
            }
            "batch" => {
                let pad = args.contains(&"--pad");
                let rest: Vec<&str> = args.iter().copied().filter(|a| *a != "--pad").collect();
                let [mode, col, labels @ ..] = rest.as_slice() else {
                    anyhow::bail!("usage: batch <ha|fa|smart> <col> <labels..> [--pad]");
                };
                self.run(Command::PlaceBatch {
                    mode: mode.parse::<BatchMode>()?,
                    column: parse_column(col)?,
                    labels: labels.iter().map(|s| s.to_string()).collect(),
                    pad,
                })?;
            }
            "move" => {
                let [label, y] = args else {
                    anyhow::bail!("usage: move <label> <y>");
                };
                let y: f64 = y
                    .parse()
                    .with_context(|| format!("'{}' is not a number", y))?;
                self.run(Command::Reposition {
                    label: label.to_string(),
                    y,
                })?;
            }
            "undo" => self.run(Command::Undo)?,
            "redo" => self.run(Command::Redo)?,
            "commit" => self.run(Command::CommitStage)?,
            "discard" => self.run(Command::DiscardStage)?,
            "reopen" => {
                let name = args.first().context("usage: reopen <stage>")?.to_string();
                let attempt = self.planner.execute(Command::ReopenStage {
                    name: name.clone(),
                    confirmed: false,
                });
                match attempt {
                    Err(SessionError::ConfirmationRequired { stage, discarded }) => {
                        let prompt = format!(
                            "Reopening {} discards {} later stage(s). Continue?",
                            stage, discarded
                        );
                        if self.confirm(&prompt) {
                            self.run(Command::ReopenStage {
                                name,
                                confirmed: true,
                            })?;
                        } else {
                            println!("Reopen cancelled");
                        }
                    }
                    other => report(&other?),
                }
            }
            "delete" => {
                let name = args.first().context("usage: delete <stage>")?.to_string();
                let prompt = format!("Delete stage {} and every stage after it?", name);
                if self.confirm(&prompt) {
                    self.run(Command::DeleteStage { name })?;
                } else {
                    println!("Delete cancelled");
                }
            }
            "rebuild" => {
                let n: usize = args
                    .first()
                    .context("usage: rebuild <n>")?
                    .parse()
                    .context("width must be a positive integer")?;
                let prompt = format!("Rebuild for N = {}? The current plan is cleared.", n);
                if self.confirm(&prompt) {
                    self.run(Command::Rebuild { n })?;
                } else {
                    println!("Rebuild cancelled");
                }
            }
            "reset" => self.run(Command::Reset)?,
            "board" => {
                let width = 2 * self.planner.width();
                print!("{}", wallace::ui::board_table(self.planner.board(), width));
            }
            "history" => {
                if let Some(report) = wallace::ui::history_report(self.planner.history(), None) {
                    print!("{}", report);
                }
            }
            "preview" => {
                let generated =
                    wallace::generate::generate_with(&self.plan(), self.config.toml.generate_options());
                print!("{}", generated.text);
            }
            "save" => {
                let path = args.first().context("usage: save <file>")?;
                save_plan(&self.plan(), Path::new(path))?;
            }
            "help" | "?" => println!("{}", HELP),
            "quit" | "exit" => return Ok(Flow::Quit),
            other => anyhow::bail!("unknown command '{}' (try 'help')", other),
        }
        Ok(Flow::Continue)
    }
}

fn parse_column(token: &str) -> Result<i64> {
    token
        .parse()
        .with_context(|| format!("'{}' is not a column index", token))
}

fn save_plan(plan: &Plan, path: &Path) -> Result<()> {
    plan.save(path)?;
    println!(
        "{}Saved {} stage(s) to {}",
        SAVE,
        plan.stages.len(),
        path.display()
    );
    Ok(())
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Opened { stage } => println!("{}Opened stage {}", STAGE, style(stage).bold()),
        Outcome::Placed { applied, skipped } => {
            for a in applied {
                match &a.instance {
                    Some(instance) => println!(
                        "{}{} {} ({}) -> {}, {}",
                        CHECK,
                        a.kind,
                        instance,
                        a.inputs.join(", "),
                        a.sum,
                        a.carry
                    ),
                    None => println!("{}{} at col {} skipped", WARN, a.kind, a.column),
                }
                for warning in &a.warnings {
                    println!("  {}", style(warning).yellow());
                }
            }
            for group in skipped {
                println!("{}Left unplaced: {}", WARN, group.join(" "));
            }
        }
        Outcome::Repositioned { label, y } => println!("{}Moved {} to {}", CHECK, label, y),
        Outcome::Undone(Some(action)) => println!("{}Undid {}", UNDO, action),
        Outcome::Undone(None) => println!("Nothing to undo"),
        Outcome::Redone(Some(action)) => println!("{}Redid {}", REDO, action),
        Outcome::Redone(None) => println!("Nothing to redo"),
        Outcome::Committed { stage } => println!("{}Committed stage {}", CHECK, stage),
        Outcome::Discarded { stage } => println!("{}Discarded stage {}", CHECK, stage),
        Outcome::Reopened { stage, discarded } => {
            println!("{}Reopened stage {}", STAGE, stage);
            if !discarded.is_empty() {
                println!("  discarded: {}", discarded.join(", "));
            }
        }
        Outcome::Deleted { removed } => println!("{}Deleted {}", CHECK, removed.join(", ")),
        Outcome::Rebuilt { n } => println!("{}Rebuilt for N = {}", REPLAY, n),
        Outcome::Reset => println!("{}Board re-derived from committed stages", REPLAY),
    }
}

pub fn cmd_plan(
    config: &PlannerConfig,
    plan_path: Option<&Path>,
    n: Option<usize>,
    script: Option<&Path>,
    save: Option<&Path>,
) -> Result<()> {
    let templates = config.toml.templates();
    let planner = match plan_path {
        Some(path) => Planner::from_plan(Plan::load_with_width(path, n)?, templates)?,
        None => Planner::new(super::generate::resolve_width(config, n)?, templates)?,
    };

    let mut input: Box<dyn BufRead> = match script {
        Some(path) => Box::new(std::io::BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("Failed to open script: {}", path.display()))?,
        )),
        None => Box::new(std::io::stdin().lock()),
    };
    let interactive = script.is_none() && std::io::stdin().is_terminal();
    let mut repl = Repl {
        planner,
        config,
        interactive,
    };

    if interactive {
        println!(
            "Planning N = {} ({} committed stage(s)). Type 'help' for commands.",
            repl.planner.width(),
            repl.planner.committed().len()
        );
    }

    let mut line = String::new();
    loop {
        if interactive {
            print!("wallace> ");
            std::io::stdout().flush().ok();
        }
        line.clear();
        if input.read_line(&mut line).context("Failed to read command")? == 0 {
            break;
        }
        match repl.handle(line.trim()) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => {
                println!("{}{:#}", CROSS, e);
                tracing::debug!(line = line.trim(), "command failed");
            }
        }
    }

    if let Some(path) = save {
        save_plan(&repl.plan(), path)?;
    }
    Ok(())
}
