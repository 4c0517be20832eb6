//! CLI command handling
//!
//! Dispatches CLI commands and formats output.

use std::path::Path;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::harness::{RunReport, TestOutcome, TestResult};
use crate::session::SessionDriver;
use crate::symbols::{BreakpointTable, SymbolResolver};
use crate::testing;

/// Dispatch a CLI command
///
/// Returns the process exit code for commands that succeed on their own
/// terms but report failures (a suite with failing tests).
pub async fn dispatch(command: Commands, config: &Config) -> Result<i32> {
    match command {
        Commands::Run { suite, json } => {
            let report = testing::run_suite(&suite, config).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }

            Ok(if report.success() { 0 } else { 1 })
        }

        Commands::Resolve {
            listing,
            map,
            names,
            json,
        } => {
            let table = SymbolResolver::new(&config.symbols.region_tag)
                .resolve_files(&listing, &map, &names)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                print_table(&table);
            }
            Ok(0)
        }

        Commands::Exec { script } => {
            exec_script(&script, config).await?;
            Ok(0)
        }
    }
}

/// Send each line of `script` as its own command and print the replies
async fn exec_script(script: &Path, config: &Config) -> Result<()> {
    let content = std::fs::read_to_string(script).map_err(|e| Error::file_read(script, e))?;
    let commands: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    let mut driver = SessionDriver::start(config).await?;
    for command in commands {
        println!("{} {}", ">".cyan(), command.bold());
        match driver.execute(command).await {
            Ok(lines) => {
                for line in lines {
                    print!("{}", line);
                }
            }
            Err(e) => {
                driver.kill().await;
                return Err(e);
            }
        }
    }

    let code = driver.shutdown().await?;
    tracing::info!(?code, "Debugger exited");
    Ok(())
}

fn print_table(table: &BreakpointTable) {
    let width = table
        .sorted()
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);
    for (name, address) in table.sorted() {
        println!("  {:width$}  0x{}", name, address, width = width);
    }
}

fn print_report(report: &RunReport) {
    println!();
    for result in &report.results {
        print_result(result);
    }

    if let Some(reason) = &report.aborted {
        println!("\n{} {}", "Run aborted:".red().bold(), reason);
    }

    let summary = format!(
        "{} passed, {} failed, {} skipped",
        report.passed_count(),
        report.failed_count(),
        report.skipped_count()
    );
    if report.success() {
        println!("\n{} {}\n", "✓".green().bold(), summary.green().bold());
    } else {
        println!("\n{} {}\n", "✗".red().bold(), summary.red().bold());
    }
}

fn print_result(result: &TestResult) {
    let duration = format!("({} ms)", result.duration_ms);
    match &result.outcome {
        TestOutcome::Passed => {
            println!("  {} {} {}", "✓".green(), result.name, duration.dimmed());
        }
        TestOutcome::Failed {
            code,
            message,
            output,
        } => {
            println!("  {} {} {}", "✗".red(), result.name, duration.dimmed());
            println!("      {} {}", code.yellow(), message);
            if let Some(output) = output {
                for line in output.lines() {
                    println!("      {}", line.dimmed());
                }
            }
        }
        TestOutcome::Skipped => {
            println!("  {} {} {}", "-".yellow(), result.name, "(skipped)".dimmed());
        }
    }
}
