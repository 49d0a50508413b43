use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::common::scenario::TestScenario;
use crate::logic::{SimulationPlan, SimulationSummary, run_plan};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub incidents: usize,
    pub events: usize,
    pub mean_peak_unrest: f64,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

#[derive(Debug, Default)]
struct IterationTally {
    successes: usize,
    failures: Vec<String>,
    incidents: usize,
    events: usize,
    peak_unrest_sum: u64,
    completed: usize,
    performance_data: Vec<Duration>,
}

pub struct LogicTester {
    verbose: bool,
}

impl LogicTester {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (turns: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.turns,
                    seed
                );
                println!("   {}", scenario.description.dimmed());
            }

            results.push(self.run_single_scenario(scenario, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let tally = self.run_simulation_iterations(&scenario.plan, seed, iterations);

        let average_duration = if tally.performance_data.is_empty() {
            Duration::ZERO
        } else {
            tally.performance_data.iter().sum::<Duration>()
                / u32::try_from(tally.performance_data.len()).unwrap_or(1)
        };
        #[allow(clippy::cast_precision_loss)]
        let mean_peak_unrest = if tally.completed == 0 {
            0.0
        } else {
            tally.peak_unrest_sum as f64 / tally.completed as f64
        };

        if !tally.failures.is_empty() {
            log::warn!(
                "{} failed {}/{} iterations for seed {seed}",
                scenario.name,
                tally.failures.len(),
                iterations
            );
        }

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: tally.failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: tally.successes,
            failures: tally.failures,
            incidents: tally.incidents,
            events: tally.events,
            mean_peak_unrest,
            average_duration,
            performance_data: tally.performance_data,
        }
    }

    fn run_simulation_iterations(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> IterationTally {
        let mut tally = IterationTally::default();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = match run_plan(plan, iteration_seed) {
                Ok(summary) => summary,
                Err(err) => {
                    let message = format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1);
                    if self.verbose {
                        println!("  ❌ {}", message.clone().red());
                    }
                    tally.failures.push(message);
                    continue;
                }
            };

            tally.completed += 1;
            tally.incidents += summary.incidents();
            tally.events += summary.events();
            tally.peak_unrest_sum += u64::from(summary.peak_unrest());

            if let Some(err) = evaluate_expectations(plan, &summary) {
                let state = &summary.final_state;
                tally.failures.push(format!(
                    "Iteration {} (seed {}, turns {}): {} | {} | final unrest {} fame {} size {}",
                    i + 1,
                    summary.seed,
                    summary.reports.len(),
                    err,
                    summarize_turns(&summary),
                    state.unrest,
                    state.fame,
                    state.size()
                ));

                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.clone().red()
                    );
                }
            } else {
                tally.successes += 1;
                let duration = start_time.elapsed();
                tally.performance_data.push(duration);

                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) checks:{} unrest:{} incidents:{} events:{}",
                        i + 1,
                        iterations,
                        summary.checks_made,
                        summary.final_state.unrest,
                        summary.incidents(),
                        summary.events()
                    );
                }
            }
        }

        tally
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    for expectation in &plan.expectations {
        if let Err(err) = expectation(summary) {
            return Some(err.to_string());
        }
    }
    None
}

fn summarize_turns(summary: &SimulationSummary) -> String {
    if summary.reports.is_empty() {
        return "no turns played".to_string();
    }

    summary
        .reports
        .iter()
        .rev()
        .take(3)
        .map(|report| {
            let incident = report.unrest.incident_id.as_deref().unwrap_or("-");
            format!(
                "turn {}: unrest {} ({}) shortage {} incident {}",
                report.turn,
                report.unrest_after,
                report.tier_after,
                report.upkeep.food_shortage,
                incident
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
