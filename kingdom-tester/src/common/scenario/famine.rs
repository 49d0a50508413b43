use anyhow::{Result, ensure};
use kingdom_core::{Hex, KingdomState, SettlementTier, Terrain, WorksiteKind};

use super::TestScenario;
use crate::logic::{SimulationPlan, SimulationSummary};

pub fn scenario() -> TestScenario {
    TestScenario::new(
        "Famine Without Farmland",
        "A town and a village live off mines and quarries with no farms",
        SimulationPlan::new(6)
            .with_setup(barren_realm)
            .with_expectation(famine_expectation),
    )
}

fn barren_realm(state: &mut KingdomState) {
    state
        .territory
        .claim(Hex::new("barren-1", Terrain::Hills).with_worksite(WorksiteKind::Quarry));
    state
        .territory
        .claim(Hex::new("barren-2", Terrain::Mountains).with_worksite(WorksiteKind::Mine));
    let founded = state
        .found_settlement("Stonegate", Some("barren-1"))
        .and_then(|_| state.found_settlement("Tinhollow", Some("barren-2")));
    match founded {
        Ok(id) => {
            if let Err(err) = state.set_settlement_tier(&id, SettlementTier::Town) {
                log::error!("famine setup could not grow {id}: {err}");
            }
        }
        Err(err) => log::error!("famine setup could not found settlements: {err}"),
    }
}

fn famine_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.total_food_shortage() > 0,
        "settlements were fed without any farms"
    );
    ensure!(
        summary.peak_unrest() > summary.initial_state.unrest,
        "shortages never raised unrest"
    );
    Ok(())
}
