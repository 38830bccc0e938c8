mod cli;
mod core;
mod execution;
mod report;

use anyhow::{Context, Result};
use cli::commands::{PlanCommand, RunCommand, ValidateCommand};
use cli::output::*;
use cli::{Cli, Command};
use crate::core::config::MatrixConfig;
use crate::core::plan::MatrixPlan;
use execution::{ExecutionEvent, MatrixEngine, ShellRunner, ShellServiceProvider};
use report::aggregate;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_matrix(cmd).await?,
        Command::Validate(cmd) => validate_matrix(cmd)?,
        Command::Plan(cmd) => show_plan(cmd)?,
    }

    Ok(())
}

async fn run_matrix(cmd: &RunCommand) -> Result<()> {
    let config = MatrixConfig::from_file(&cmd.file)
        .context("Failed to load matrix definition")?;
    let plan = MatrixPlan::from_config(&config)
        .context("Failed to build matrix plan")?;

    println!(
        "{} Loaded matrix: {} ({} combinations)",
        INFO,
        style(&plan.name).bold(),
        style(plan.combinations.len()).cyan()
    );

    let engine = MatrixEngine::new(
        Arc::new(ShellRunner::new()),
        Arc::new(ShellServiceProvider),
        cmd.scheduling_strategy(),
    );

    // Progress bar over combinations, driven by the event stream
    let progress = create_progress_bar(plan.combinations.len());
    let bar = progress.clone();
    engine.add_event_handler(move |event| {
        if matches!(event, ExecutionEvent::CombinationFinished { .. }) {
            bar.inc(1);
        }
        bar.println(format_execution_event(&event));
    });

    println!();
    let results = engine.execute(&plan).await.map_err(anyhow::Error::msg)?;
    progress.finish_and_clear();

    let outcome = aggregate(&plan.name, results);

    // Machine-readable report for external upload steps
    if let Some(path) = &cmd.report {
        let json = serde_json::to_string_pretty(&outcome)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!(
            "{} Report written to {}",
            INFO,
            style(path.display()).dim()
        );
    }

    println!();
    print!("{}", outcome.render_summary());

    let exit_code = outcome.exit_code();
    if exit_code == 0 {
        println!(
            "\n{} {} {}",
            CHECK,
            style(&plan.name).bold(),
            format_status(outcome.status)
        );
        Ok(())
    } else {
        println!(
            "\n{} {} {}",
            CROSS,
            style(&plan.name).bold(),
            format_status(outcome.status)
        );
        std::process::exit(exit_code);
    }
}

fn validate_matrix(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating matrix definition...", INFO);

    match MatrixConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Matrix definition is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Axes: {}", style(config.axes.len()).cyan());
            println!("  Exclusions: {}", style(config.exclude.len()).cyan());
            println!("  Services: {}", style(config.services.len()).cyan());
            println!("  Steps: {}", style(config.steps.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

fn show_plan(cmd: &PlanCommand) -> Result<()> {
    let config = MatrixConfig::from_file(&cmd.file)
        .context("Failed to load matrix definition")?;
    let plan = MatrixPlan::from_config(&config)
        .context("Failed to build matrix plan")?;

    if cmd.json {
        let attributes: Vec<_> = plan
            .combinations
            .iter()
            .map(|c| c.attributes())
            .collect();
        let data = serde_json::json!({
            "name": plan.name,
            "combinations": attributes,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!(
        "{} {} would run {} combinations:",
        INFO,
        style(&plan.name).bold(),
        style(plan.combinations.len()).cyan()
    );
    for combination in &plan.combinations {
        println!("  [{}]", style(combination.label()).cyan());
    }

    Ok(())
}
