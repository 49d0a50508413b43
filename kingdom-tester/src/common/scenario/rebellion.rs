use anyhow::{Result, ensure};
use kingdom_core::{Hex, KingdomState, Terrain, UnrestTier, WorksiteKind, get_unrest_tier};

use super::TestScenario;
use crate::logic::{SimulationPlan, SimulationSummary};

const STARTING_UNREST: u32 = 12;

pub fn scenario() -> TestScenario {
    TestScenario::new(
        "Rebellion At War",
        "A kingdom at war starts in open rebellion and must weather incidents",
        SimulationPlan::new(6)
            .with_setup(restless_realm)
            .with_check_modifier(4)
            .with_expectation(rebellion_expectation),
    )
}

fn restless_realm(state: &mut KingdomState) {
    for (idx, terrain, worksite) in [
        (1, Terrain::Plains, WorksiteKind::Farmstead),
        (2, Terrain::Plains, WorksiteKind::Farmstead),
        (3, Terrain::Forest, WorksiteKind::LoggingCamp),
    ] {
        state
            .territory
            .claim(Hex::new(format!("rebel-{idx}"), terrain).with_worksite(worksite));
    }
    if let Err(err) = state.found_settlement("Varnhold", Some("rebel-1")) {
        log::error!("rebellion setup could not found a settlement: {err}");
    }
    state.recruit_army("Varnhold Levy", 2);
    state.at_war = true;
    state.add_unrest(STARTING_UNREST);
}

fn rebellion_expectation(summary: &SimulationSummary) -> Result<()> {
    let first = summary
        .reports
        .first()
        .ok_or_else(|| anyhow::anyhow!("no turns were played"))?;
    ensure!(
        first.unrest.breakdown.war > 0,
        "war did not contribute unrest"
    );
    ensure!(
        get_unrest_tier(summary.initial_state.unrest) >= 3,
        "setup did not start in rebellion"
    );
    ensure!(
        summary.incidents() > 0,
        "no incident was rolled in {} turns of rebellion",
        summary.reports.len()
    );
    ensure!(
        summary
            .reports
            .iter()
            .any(|r| r.tier_after > UnrestTier::Stable),
        "unrest fell to stable immediately"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_starts_in_rebellion() {
        let mut state = KingdomState::default();
        restless_realm(&mut state);
        assert_eq!(state.unrest, STARTING_UNREST);
        assert!(state.at_war);
        assert_eq!(state.armies.len(), 1);
        assert_eq!(get_unrest_tier(state.unrest), 3);
    }
}
