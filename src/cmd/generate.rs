//! Batch generation commands: `wallace generate` and `wallace seed`.

use anyhow::{Context, Result};
use std::path::Path;

use wallace::config::PlannerConfig;
use wallace::plan::Plan;

/// Resolve the width from the CLI or config, rejecting N < 2.
pub(crate) fn resolve_width(config: &PlannerConfig, n: Option<usize>) -> Result<usize> {
    let n = n.unwrap_or_else(|| config.toml.width());
    if n < 2 {
        anyhow::bail!("Invalid width N = {}: N must be at least 2", n);
    }
    Ok(n)
}

pub fn cmd_generate(
    config: &PlannerConfig,
    plan_path: Option<&Path>,
    n: Option<usize>,
    module: Option<&str>,
    out: Option<&Path>,
) -> Result<()> {
    use console::style;
    use wallace::generate::generate_with;
    use wallace::ui::icons::{CHECK, WARN};

    let mut plan = match plan_path {
        Some(path) => Plan::load_with_width(path, n)?,
        None => Plan::new(resolve_width(config, n)?),
    };
    match module {
        Some(name) => plan.module_name = Some(name.to_string()),
        None => {
            let n = plan.n;
            plan.module_name
                .get_or_insert_with(|| config.toml.module_name_for(n));
        }
    }

    let generated = generate_with(&plan, config.toml.generate_options());

    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
            std::fs::write(path, &generated.text)
                .with_context(|| format!("Failed to write module to {}", path.display()))?;
            println!(
                "{}Wrote {} ({} stage(s)) to {}",
                CHECK,
                style(plan.module_name()).bold(),
                generated.stages.len(),
                path.display()
            );
        }
        None => print!("{}", generated.text),
    }

    if !generated.warnings.is_empty() {
        eprintln!(
            "{}{} structural warning(s) embedded in the output",
            WARN,
            generated.warnings.len()
        );
    }
    Ok(())
}

pub fn cmd_seed(config: &PlannerConfig, n: Option<usize>) -> Result<()> {
    use wallace::board::Board;
    use wallace::ui::board_table;

    let n = resolve_width(config, n)?;
    println!();
    println!("Seeded board for N = {}", n);
    println!();
    print!("{}", board_table(&Board::seeded(n), 2 * n));
    println!();
    Ok(())
}
