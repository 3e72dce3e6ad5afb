//! End-to-end runs of the simulator

use hypercycle_common::{InventoryPruning, ReproductionPolicy, Topology};
use hypercycle_sim::{Chemistry, SimConfig, Simulation, Tick};
use proptest::prelude::*;

fn config(seed: u64) -> SimConfig {
    let mut config = SimConfig::default();
    config.grid.width = 5;
    config.grid.height = 5;
    config.rules.product_types = 5;
    config.rules.rules_per_cell = 4;
    config.urn.tokens_per_type = 30;
    config.run.seed = seed;
    config.run.ticks = 1_000;
    config.run.sample_interval = 250;
    config.run.progress_interval = 0;
    config
}

#[test]
fn test_full_run_report() {
    let mut cfg = config(11);
    cfg.run.audit = true;
    let report = Simulation::from_config(cfg).unwrap().run().unwrap();

    assert_eq!(report.final_state.total_rules, 100);
    assert_eq!(report.samples.len(), 4);
    assert_eq!(report.samples[3].tick, 1_000);
    assert!(report.final_state.step >= 1_000);
    assert_eq!(
        report.final_state.type_counts.values().sum::<usize>(),
        report.final_state.total_rules
    );

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"final_state\""));
}

#[test]
fn test_same_seed_same_run() {
    let first = Simulation::from_config(config(42)).unwrap().run().unwrap();
    let second = Simulation::from_config(config(42)).unwrap().run().unwrap();

    assert_eq!(first.final_state, second.final_state);
    assert_eq!(first.samples, second.samples);
    assert_eq!(first.types, second.types);
    assert_eq!(first.lifespans, second.lifespans);
    assert_ne!(first.run_id, second.run_id);
}

#[test]
fn test_every_behavior_combination_stays_consistent() {
    for reproduction in [ReproductionPolicy::Source, ReproductionPolicy::Target] {
        for topology in [Topology::Spatial, Topology::Nonspatial] {
            for intelligent in [false, true] {
                let mut cfg = config(7);
                cfg.behavior.reproduction = reproduction;
                cfg.behavior.intelligent = intelligent;
                cfg.behavior.pruning = InventoryPruning::RemoveKey;
                cfg.grid.topology = topology;
                cfg.rules.chemistry = Chemistry::Random;
                cfg.run.ticks = 400;

                let mut sim = Simulation::from_config(cfg).unwrap();
                for _ in 0..400 {
                    sim.tick().unwrap();
                }
                sim.net().audit().unwrap();
                assert_eq!(sim.net().total_rules(), 100);
            }
        }
    }
}

#[test]
fn test_intelligent_cells_never_mismatch() {
    let mut cfg = config(3);
    cfg.behavior.intelligent = true;
    let mut sim = Simulation::from_config(cfg).unwrap();
    for _ in 0..500 {
        sim.tick().unwrap();
    }
    assert_eq!(sim.stats().counters().mismatched, 0);
}

#[test]
fn test_ticks_always_step_a_cell() {
    let mut sim = Simulation::from_config(config(9)).unwrap();
    let tick = sim.tick().unwrap();
    // Every cell starts with rules
    assert!(matches!(tick, Tick::Stepped { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_rules_conserved_for_any_seed(seed in any::<u64>(), ticks in 1u64..400) {
        let mut cfg = config(seed);
        cfg.run.ticks = ticks;
        let report = Simulation::from_config(cfg).unwrap().run().unwrap();
        prop_assert_eq!(report.final_state.total_rules, 100);
        prop_assert_eq!(report.final_state.counters.ticks, ticks);
    }
}
