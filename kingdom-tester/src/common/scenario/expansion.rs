use anyhow::{Result, ensure};
use kingdom_core::{
    Hex, KingdomSession, KingdomState, MapEdit, MapEditOutcome, Terrain, WorksiteKind,
    apply_map_edit,
};

use super::TestScenario;
use crate::logic::{SimulationPlan, SimulationSummary};

const FRONTIER: [(Terrain, WorksiteKind); 4] = [
    (Terrain::Plains, WorksiteKind::Farmstead),
    (Terrain::Forest, WorksiteKind::LoggingCamp),
    (Terrain::Hills, WorksiteKind::Quarry),
    (Terrain::Swamp, WorksiteKind::Mine),
];

pub fn scenario() -> TestScenario {
    TestScenario::new(
        "Frontier Expansion",
        "Players claim a new hex and build a worksite before every turn",
        SimulationPlan::new(8)
            .with_setup(capital)
            .with_turn_hook(claim_frontier)
            .with_expectation(expansion_expectation),
    )
}

fn capital(state: &mut KingdomState) {
    state
        .territory
        .claim(Hex::new("capital", Terrain::Plains).with_worksite(WorksiteKind::Farmstead));
    if let Err(err) = state.found_settlement("Tatzlford", Some("capital")) {
        log::error!("expansion setup could not found the capital: {err}");
    }
}

fn claim_frontier(session: &mut KingdomSession, turn: u32) -> Result<()> {
    let index = usize::try_from(turn).unwrap_or(0) % FRONTIER.len();
    let (terrain, worksite) = FRONTIER[index];
    let id = format!("frontier-{turn}");
    session.with_state_mut(|state| -> Result<()> {
        apply_map_edit(
            state,
            MapEdit::Claim {
                hex: Hex::new(id.clone(), terrain),
            },
        )?;
        let outcome = apply_map_edit(
            state,
            MapEdit::PlaceWorksite {
                id: id.clone(),
                kind: worksite,
            },
        )?;
        log::debug!("turn {turn}: {outcome:?}");
        ensure!(
            matches!(outcome, MapEditOutcome::WorksitePlaced { .. }),
            "worksite on {id} was not placed"
        );
        Ok(())
    })
}

fn expansion_expectation(summary: &SimulationSummary) -> Result<()> {
    let turns = summary.reports.len();
    ensure!(
        summary.final_state.size() == summary.initial_state.size() + turns,
        "expected {} hexes, kingdom holds {}",
        summary.initial_state.size() + turns,
        summary.final_state.size()
    );
    let production = summary.production_by_turn();
    ensure!(
        production.windows(2).all(|pair| pair[1] > pair[0]),
        "production did not grow every turn: {production:?}"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::run_plan;
    use kingdom_core::ResourceKind;

    #[test]
    fn frontier_grows_production() {
        let summary = run_plan(&scenario().plan, 2024).unwrap();
        expansion_expectation(&summary).unwrap();
        let counts = summary.final_state.territory.worksite_counts();
        assert_eq!(counts.get(&WorksiteKind::BogMine), Some(&2));
        assert!(
            summary.reports.last().unwrap().resources_gained.get(ResourceKind::Food)
                > summary.reports[0].resources_gained.get(ResourceKind::Food)
        );
    }
}
