use anyhow::{Result, ensure};
use kingdom_core::{Hex, KingdomState, ResourceKind, Terrain, WorksiteKind};

use super::TestScenario;
use crate::logic::{SimulationPlan, SimulationSummary};

const SMOKE_TURNS: u32 = 3;

pub fn scenario() -> TestScenario {
    TestScenario::new(
        "Smoke Test",
        "A small farming village plays a few quiet turns",
        SimulationPlan::new(SMOKE_TURNS)
            .with_setup(founded_village)
            .with_expectation(smoke_expectation),
    )
}

fn founded_village(state: &mut KingdomState) {
    state
        .territory
        .claim(Hex::new("smoke-1", Terrain::Plains).with_worksite(WorksiteKind::Farmstead));
    state
        .territory
        .claim(Hex::new("smoke-2", Terrain::Plains).with_worksite(WorksiteKind::Farmstead));
    state
        .territory
        .claim(Hex::new("smoke-3", Terrain::Forest).with_worksite(WorksiteKind::LoggingCamp));
    if let Err(err) = state.found_settlement("Oleg's Post", Some("smoke-1")) {
        log::error!("smoke setup could not found a settlement: {err}");
    }
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    let state = &summary.final_state;
    ensure!(state.settlements.len() == 1, "settlement missing after setup");
    ensure!(
        state.size() == summary.initial_state.size(),
        "territory changed during a quiet run"
    );
    for report in &summary.reports {
        ensure!(
            report.resources_gained.get(ResourceKind::Food) == 4,
            "turn {} produced {} food",
            report.turn,
            report.resources_gained.get(ResourceKind::Food)
        );
        ensure!(
            report.status.fame_gained == 1,
            "turn {} gained no fame",
            report.turn
        );
    }
    for kind in [ResourceKind::Lumber, ResourceKind::Stone, ResourceKind::Ore] {
        ensure!(
            state.resources.get(kind) == 0,
            "{kind:?} survived the turn rollover"
        );
    }
    ensure!(
        state.turn.phases_completed.is_empty(),
        "phases were not cleared for the new turn"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::run_plan;

    #[test]
    fn smoke_passes_for_default_seed() {
        let scenario = scenario();
        let summary = run_plan(&scenario.plan, 1337).unwrap();
        smoke_expectation(&summary).unwrap();
        assert!(summary.checks_made <= SMOKE_TURNS * 2);
    }
}
