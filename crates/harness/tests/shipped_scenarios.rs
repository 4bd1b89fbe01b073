//! The scenario files shipped in `scenarios/` must always parse and stay
//! internally consistent.

use std::collections::HashSet;
use std::path::PathBuf;

use conduit_harness::{Scenario, ScenarioStep};

fn scenarios_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("scenarios")
}

#[test]
fn all_shipped_scenarios_parse() {
    let scenarios = Scenario::load_all(&scenarios_dir()).unwrap();
    assert!(!scenarios.is_empty(), "no shipped scenarios found");

    for scenario in &scenarios {
        assert!(!scenario.steps.is_empty(), "{} has no steps", scenario.name);
    }
}

#[test]
fn shipped_scenario_names_are_unique() {
    let scenarios = Scenario::load_all(&scenarios_dir()).unwrap();
    let mut names = HashSet::new();
    for scenario in &scenarios {
        assert!(
            names.insert(scenario.name.clone()),
            "duplicate scenario name: {}",
            scenario.name
        );
    }
}

#[test]
fn shipped_scenarios_end_in_an_assertion() {
    let scenarios = Scenario::load_all(&scenarios_dir()).unwrap();
    for scenario in &scenarios {
        assert!(
            matches!(scenario.steps.last(), Some(ScenarioStep::Assert { .. })),
            "{} does not end with an assert step",
            scenario.name
        );
    }
}

#[test]
fn smoke_tag_selects_a_subset() {
    let scenarios = Scenario::load_all(&scenarios_dir()).unwrap();
    let smoke = Scenario::filter_by_tag(&scenarios, "smoke");
    assert!(!smoke.is_empty());
    assert!(smoke.len() < scenarios.len());
}
