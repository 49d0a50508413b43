use anyhow::Result;
use colored::Colorize;
use kingdom_core::numbers::round_f64_to_i32;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;

/// Roll-up of a batch of scenario results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunTotals {
    pub scenarios: usize,
    pub passed: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub incidents: usize,
    pub events: usize,
}

#[must_use]
pub fn summarize(results: &[ScenarioResult]) -> RunTotals {
    let scenarios = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    #[allow(clippy::cast_precision_loss)]
    let success_rate = if scenarios == 0 {
        0.0
    } else {
        (passed as f64 / scenarios as f64) * 100.0
    };
    RunTotals {
        scenarios,
        passed,
        failed: scenarios - passed,
        success_rate,
        incidents: results.iter().map(|r| r.incidents).sum(),
        events: results.iter().map(|r| r.events).sum(),
    }
}

/// Peak unrest rounded for display.
#[must_use]
pub fn display_peak_unrest(result: &ScenarioResult) -> i32 {
    round_f64_to_i32(result.mean_peak_unrest)
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Kingdom Simulation Results".bright_cyan().bold())?;
    writeln!(out, "{}", "=============================".cyan())?;

    let totals = summarize(results);
    writeln!(out, "Total runs: {}", totals.scenarios)?;
    writeln!(out, "Passed: {}", totals.passed.to_string().green())?;
    writeln!(out, "Failed: {}", totals.failed.to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", totals.success_rate)?;
    writeln!(out, "Incidents rolled: {}", totals.incidents)?;
    writeln!(out, "Events drawn: {}", totals.events)?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Peak unrest (mean): {}", display_peak_unrest(result))?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    if let (Some(fastest), Some(slowest)) = (
        results.iter().min_by_key(|r| r.average_duration),
        results.iter().max_by_key(|r| r.average_duration),
    ) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# Kingdom Simulation Results\n")?;

    let totals = summarize(results);
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total runs**: {}", totals.scenarios)?;
    writeln!(out, "- **Passed**: {}", totals.passed)?;
    writeln!(out, "- **Failed**: {}", totals.failed)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", totals.success_rate)?;

    writeln!(out, "## Detailed Results\n")?;
    writeln!(out, "| Scenario | Seed | Passed | Incidents | Events | Peak unrest |")?;
    writeln!(out, "|---|---|---|---|---|---|")?;
    for result in results {
        writeln!(
            out,
            "| {} | {} | {}/{} | {} | {} | {} |",
            result.scenario_name,
            result.seed,
            result.successful_iterations,
            result.iterations_run,
            result.incidents,
            result.events,
            display_peak_unrest(result)
        )?;
    }
    writeln!(out)?;

    for result in results.iter().filter(|r| !r.failures.is_empty()) {
        writeln!(out, "### ❌ {} (seed {})\n", result.scenario_name, result.seed)?;
        for failure in &result.failures {
            writeln!(out, "- {failure}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
