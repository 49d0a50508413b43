pub mod checker;
pub mod reports;
pub mod seeds;
pub mod simulation;
pub mod tester;

pub use seeds::resolve_seed_inputs;
pub use simulation::{SimulationPlan, SimulationSummary, run_plan};
pub use tester::*;
