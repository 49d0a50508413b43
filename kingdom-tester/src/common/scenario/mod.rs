use crate::logic::SimulationPlan;

pub mod expansion;
pub mod famine;
pub mod rebellion;
pub mod smoke;

/// A named simulation plan the tester can run across seeds.
#[derive(Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        plan: SimulationPlan,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            plan,
        }
    }
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    match name.to_lowercase().as_str() {
        "smoke" => Some(smoke::scenario()),
        "famine" | "starvation" => Some(famine::scenario()),
        "rebellion" | "unrest" => Some(rebellion::scenario()),
        "expansion" | "growth" => Some(expansion::scenario()),
        _ => None,
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("famine", "Famine Without Farmland"),
        ("rebellion", "Rebellion At War"),
        ("expansion", "Frontier Expansion"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, label) in list_scenarios() {
            let scenario = get_scenario(key).unwrap_or_else(|| panic!("{key} missing"));
            assert_eq!(scenario.name, label);
            assert!(!scenario.description.is_empty());
        }
        assert!(get_scenario("SMOKE").is_some());
        assert!(get_scenario("growth").is_some());
        assert!(get_scenario("nope").is_none());
    }
}
