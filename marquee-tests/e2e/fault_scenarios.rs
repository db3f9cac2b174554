//! Every fault scenario across several seeds.

use std::time::Duration;

use marquee_core::player::{FaultKind, SessionPhase};
use marquee_sim::{Scenario, SimulationConfig, run_scenario};

const RUN_FOR: Duration = Duration::from_secs(15);

fn config(seed: u64) -> SimulationConfig {
    SimulationConfig {
        media_duration: 30.0,
        ..SimulationConfig::with_seed(seed)
    }
}

#[tokio::test]
async fn test_all_scenarios_hold_invariants() {
    for scenario in Scenario::ALL {
        for seed in [101, 202] {
            let report = run_scenario(scenario, config(seed), RUN_FOR).await.unwrap();
            assert!(
                report.violations.is_empty(),
                "{scenario} seed {seed}: {:?}",
                report.violations
            );
            assert!(
                matches!(report.final_phase, SessionPhase::Ended | SessionPhase::Failed),
                "{scenario} seed {seed} stalled in {:?}",
                report.final_phase
            );
        }
    }
}

#[tokio::test]
async fn test_network_faults_beyond_budget_fail() {
    let mut base = config(303);
    base.scripted_faults = (1..=4)
        .map(|tick| {
            marquee_sim::ScriptedFault::new(0, tick, marquee_core::media::RawErrorKind::Network)
        })
        .collect();

    let report = run_scenario(Scenario::Steady, base, RUN_FOR).await.unwrap();
    let failure = report.failure.expect("fourth network fault is fatal");
    assert_eq!(failure.kind, FaultKind::NetworkFault);
    assert_eq!(failure.attempts, 3);
    assert_eq!(report.final_phase, SessionPhase::Failed);
    assert_eq!(report.backend.engines_released, 1);
}

#[tokio::test]
async fn test_same_seed_same_outcome() {
    let first = run_scenario(Scenario::Chaos, config(404), RUN_FOR).await.unwrap();
    let second = run_scenario(Scenario::Chaos, config(404), RUN_FOR).await.unwrap();

    assert_eq!(first.final_phase, second.final_phase);
    assert_eq!(first.backend.faults_injected, second.backend.faults_injected);
    assert_eq!(first.failure, second.failure);
}
