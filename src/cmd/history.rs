//! Audit trail command: `wallace history`.

use anyhow::{Context, Result};
use std::path::Path;

use wallace::history::History;
use wallace::plan::Plan;

pub fn cmd_history(plan_path: &Path, stage: Option<&str>, json: bool) -> Result<()> {
    use wallace::finalize::finalize;
    use wallace::ui::{history_report, operand_summary};

    let plan = Plan::load(plan_path)?;
    let history = History::replay(plan.n, &plan.stages);
    let not_found = || {
        anyhow::anyhow!(
            "Stage {} not found in {}",
            stage.unwrap_or_default(),
            plan_path.display()
        )
    };

    if json {
        let value = match stage {
            Some(name) => serde_json::to_value(history.get(name).ok_or_else(not_found)?),
            None => serde_json::to_value(&history),
        }
        .context("Failed to serialize history")?;
        let text = serde_json::to_string_pretty(&value).context("Failed to serialize history")?;
        println!("{}", text);
        return Ok(());
    }

    let report = history_report(&history, stage).ok_or_else(not_found)?;
    println!();
    println!(
        "History of {} (N = {}, {} stage(s))",
        plan.module_name(),
        plan.n,
        history.len()
    );
    println!();
    print!("{}", report);
    if stage.is_none() {
        println!();
        print!(
            "{}",
            operand_summary(&finalize(history.final_board(), plan.output_width()))
        );
    }
    println!();
    Ok(())
}
