use anyhow::{Context, Result, bail};
use kingdom_core::{KingdomConfig, KingdomSession, KingdomState, TurnReport};

use super::checker::RollingChecker;

pub type SetupFn = fn(&mut KingdomState);
pub type TurnHookFn = fn(&mut KingdomSession, u32) -> Result<()>;
pub type ExpectationFn = fn(&SimulationSummary) -> Result<()>;

/// What a scenario runs: starting kingdom, turn count, between-turn player
/// moves and the checks made on the outcome.
#[derive(Clone)]
pub struct SimulationPlan {
    pub turns: u32,
    pub players: Vec<String>,
    pub check_modifier: i32,
    pub config: KingdomConfig,
    pub setup: Option<SetupFn>,
    pub before_turn: Option<TurnHookFn>,
    pub expectations: Vec<ExpectationFn>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(turns: u32) -> Self {
        Self {
            turns,
            players: vec![String::from("Ruler")],
            check_modifier: 6,
            config: KingdomConfig::default(),
            setup: None,
            before_turn: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_setup(mut self, setup: SetupFn) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_turn_hook(mut self, hook: TurnHookFn) -> Self {
        self.before_turn = Some(hook);
        self
    }

    #[must_use]
    pub fn with_check_modifier(mut self, modifier: i32) -> Self {
        self.check_modifier = modifier;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: ExpectationFn) -> Self {
        self.expectations.push(expectation);
        self
    }

    #[must_use]
    pub fn with_turns(mut self, turns: u32) -> Self {
        self.turns = turns;
        self
    }
}

/// Everything a run produced, handed to the expectations.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub initial_state: KingdomState,
    pub reports: Vec<TurnReport>,
    pub final_state: KingdomState,
    pub checks_made: u32,
}

impl SimulationSummary {
    #[must_use]
    pub fn incidents(&self) -> usize {
        self.reports.iter().filter(|r| r.incident.is_some()).count()
    }

    #[must_use]
    pub fn events(&self) -> usize {
        self.reports.iter().filter(|r| r.event.is_some()).count()
    }

    #[must_use]
    pub fn total_food_shortage(&self) -> u32 {
        self.reports.iter().map(|r| r.upkeep.food_shortage).sum()
    }

    #[must_use]
    pub fn production_by_turn(&self) -> Vec<u32> {
        self.reports
            .iter()
            .map(|r| r.resources_gained.total())
            .collect()
    }

    #[must_use]
    pub fn peak_unrest(&self) -> u32 {
        self.reports
            .iter()
            .map(|r| r.unrest_after)
            .max()
            .unwrap_or(self.initial_state.unrest)
    }
}

/// Play a plan to completion for one seed.
///
/// # Errors
///
/// Fails when the plan's setup produces an invalid kingdom or a turn cannot be
/// played.
pub fn run_plan(plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
    plan.config
        .validate()
        .context("scenario rules config is invalid")?;
    let mut state = KingdomState::new("Test Kingdom", plan.players.clone(), &plan.config);
    if let Some(setup) = plan.setup {
        setup(&mut state);
    }
    let initial_state = state.clone();
    let mut session = KingdomSession::new(state, plan.config.clone(), seed);
    let mut checker = RollingChecker::new(seed ^ 0x5EED, plan.check_modifier);
    let mut reports = Vec::with_capacity(usize::try_from(plan.turns).unwrap_or(0));

    for turn in 1..=plan.turns {
        if let Some(hook) = plan.before_turn {
            hook(&mut session, turn).with_context(|| format!("turn {turn} setup failed"))?;
        }
        let report = session
            .play_turn(&mut checker)
            .with_context(|| format!("turn {turn} could not be played"))?;
        log::debug!(
            "seed {seed} turn {turn}: unrest {} ({}) shortage {} incident {:?}",
            report.unrest_after,
            report.tier_after,
            report.upkeep.food_shortage,
            report.unrest.incident_id
        );
        reports.push(report);
    }

    let final_state = session.into_state();
    if final_state.turn.turn != plan.turns + 1 {
        bail!(
            "expected to finish on turn {}, kingdom is on turn {}",
            plan.turns + 1,
            final_state.turn.turn
        );
    }

    Ok(SimulationSummary {
        seed,
        initial_state,
        reports,
        final_state,
        checks_made: checker.checks_made(),
    })
}
