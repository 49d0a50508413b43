use kingdom_core::{
    CheckReport, DegreeOfSuccess, Hex, KingdomConfig, KingdomError, KingdomSession, KingdomState,
    PhaseAdvance, ResourceKind, SettlementTier, Terrain, TurnPhase, ValidationError, WorksiteKind,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn founded_kingdom() -> KingdomState {
    let cfg = KingdomConfig::default();
    let mut state = KingdomState::new("Tuskwater", vec!["Aria".into(), "Bren".into()], &cfg);
    state
        .territory
        .claim(Hex::new("t1", Terrain::Plains).with_worksite(WorksiteKind::Farmstead));
    state
        .territory
        .claim(Hex::new("t2", Terrain::Plains).with_worksite(WorksiteKind::Farmstead));
    state
        .territory
        .claim(Hex::new("t3", Terrain::Forest).with_worksite(WorksiteKind::LoggingCamp));
    state
        .territory
        .claim(Hex::new("t4", Terrain::Hills).with_worksite(WorksiteKind::Quarry));
    state.found_settlement("Tatzlford", Some("t1")).unwrap();
    state.recruit_army("Tatzlford Watch", 1);
    state
}

fn rolling_checker(seed: u64) -> impl FnMut(&str, i32) -> Result<CheckReport, KingdomError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    move |_skill, dc| {
        let total = rng.gen_range(1..=20) + 6;
        Ok(CheckReport::from_total(total, dc))
    }
}

#[test]
fn twelve_turn_campaign_keeps_invariants() {
    let mut session = KingdomSession::new(founded_kingdom(), KingdomConfig::default(), 0xC0FFEE);
    let mut checker = rolling_checker(11);

    for expected_turn in 1..=12 {
        let report = session.play_turn(&mut checker).unwrap();
        assert_eq!(report.turn, expected_turn);
        assert_eq!(report.resources_gained.get(ResourceKind::Food), 4);
        assert_eq!(report.resources_gained.get(ResourceKind::Lumber), 2);
        assert_eq!(report.resources_gained.get(ResourceKind::Stone), 1);
        assert_eq!(report.status.fame_gained, 1);

        let state = session.state();
        assert_eq!(state.turn.turn, expected_turn + 1);
        assert_eq!(state.turn.phase, TurnPhase::Status);
        for kind in [ResourceKind::Lumber, ResourceKind::Stone, ResourceKind::Ore] {
            assert_eq!(state.resources.get(kind), 0, "{kind:?} survives rollover");
        }
        assert!(state.turn.phases_completed.is_empty());
        assert!(state.current_event.is_none());
        assert!(state.turn.current_incident_id.is_none());
        assert_eq!(state.size(), 4);
    }

    let state = session.into_state();
    assert!(state.log.iter().any(|key| key == "log.turn.started"));
}

#[test]
fn identical_seeds_replay_identically() {
    let run = |seed: u64| {
        let mut session = KingdomSession::new(founded_kingdom(), KingdomConfig::default(), seed);
        let mut checker = rolling_checker(seed);
        let reports: Vec<_> = (0..8)
            .map(|_| session.play_turn(&mut checker).unwrap())
            .collect();
        (reports, session.into_state())
    };
    for seed in [1_u64, 42, 0xDEAD_BEEF] {
        assert_eq!(run(seed), run(seed));
    }
}

#[test]
fn phases_can_be_driven_by_hand() {
    let mut checker = |_skill: &str, dc: i32| -> Result<CheckReport, KingdomError> {
        Ok(CheckReport::from_total(dc + 2, dc))
    };
    let mut session = KingdomSession::new(founded_kingdom(), KingdomConfig::default(), 3);

    assert_eq!(
        session.run_upkeep().unwrap_err(),
        ValidationError::PhaseLocked(TurnPhase::Upkeep)
    );
    session.run_status().unwrap();
    assert!(matches!(
        session.advance_phase(),
        PhaseAdvance::Advanced {
            from: TurnPhase::Status,
            to: TurnPhase::Resources
        }
    ));
    let gained = session.run_resources().unwrap();
    assert_eq!(gained.get(ResourceKind::Food), 4);

    // Earlier phases stay reachable, but their steps do not repeat.
    assert_eq!(
        session.run_status().unwrap_err(),
        ValidationError::AlreadyUsedThisTurn("gain-fame".into())
    );
    assert!(session.run_resources().is_err());
    assert_eq!(session.state().fame, 1);
    assert_eq!(session.state().resources.get(ResourceKind::Food), 4);

    session.advance_phase();
    let unrest = session.run_unrest().unwrap();
    assert_eq!(unrest.breakdown.total(), 0);
    assert!(unrest.incident_id.is_none(), "stable kingdoms never roll");

    session.advance_phase();
    if session.run_events().unwrap().is_some() {
        session.resolve_current_event(&mut checker, None).unwrap();
    }
    session.advance_phase();
    session.advance_phase();
    let upkeep = session.run_upkeep().unwrap();
    assert_eq!(upkeep.food_shortage, 0);
    assert_eq!(upkeep.unsupported_armies, 0);
    assert!(matches!(
        session.advance_phase(),
        PhaseAdvance::TurnEnded { turn: 2, .. }
    ));
}

#[test]
fn growing_cities_outpace_their_farms() {
    let mut state = founded_kingdom();
    let id = state.settlements[0].id.clone();
    state.set_settlement_tier(&id, SettlementTier::City).unwrap();
    let mut session = KingdomSession::new(state, KingdomConfig::default(), 99);
    let mut steady = |_skill: &str, dc: i32| -> Result<CheckReport, KingdomError> {
        Ok(CheckReport::from_total(dc, dc))
    };

    let mut shortages = 0;
    for _ in 0..4 {
        let report = session.play_turn(&mut steady).unwrap();
        shortages += report.upkeep.food_shortage;
        if let Some(resolution) = &report.incident {
            assert_eq!(resolution.degree, DegreeOfSuccess::Success);
        }
    }
    assert!(shortages > 0);
    assert!(session.state().unrest > 0);
}
