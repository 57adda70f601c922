use paging_sim::policy::Policy;
use paging_sim::simulation::{Settings, Simulation};
use paging_sim::stattrack::AggregateStatistics;
use paging_sim::trace::{Movement, TraceEvent};
use paging_sim::{derive_seed, NUM_RUNS, TOTAL_FRAMES};

fn rendered_trace(policy: Policy, seed: u64) -> String {
    let outcome = Simulation::build(Settings::default(), policy, seed)
        .run()
        .unwrap();
    outcome
        .trace
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn identical_seed_identical_trace() {
    Policy::ALL.iter().for_each(|policy| {
        let seed = derive_seed(1, *policy);
        assert_eq!(rendered_trace(*policy, seed), rendered_trace(*policy, seed));
    });
}

#[test]
fn different_seed_different_trace() {
    assert_ne!(
        rendered_trace(Policy::Fifo, 1000),
        rendered_trace(Policy::Fifo, 1100)
    );
}

#[test]
fn frames_conserved_every_step() {
    Policy::ALL.iter().for_each(|policy| {
        let settings = Settings::default();
        let mut sim = Simulation::build(settings, *policy, derive_seed(0, *policy));
        while sim.clock_ms() <= settings.horizon_ms {
            sim.step().unwrap();
            let memory = sim.memory();
            assert_eq!(memory.free_count() + memory.resident_pages(), TOTAL_FRAMES);
            memory.running_ids().iter().for_each(|pid| {
                let process = memory.process(*pid).unwrap();
                assert!(process.pages_in_memory <= process.size_pages);
            });
        }
    });
}

#[test]
fn admitted_in_arrival_order() {
    Policy::ALL.iter().for_each(|policy| {
        let outcome = Simulation::build(Settings::default(), *policy, derive_seed(2, *policy))
            .run()
            .unwrap();
        let entered: Vec<&str> = outcome
            .trace
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Admission {
                    name,
                    movement: Movement::Enter,
                    ..
                } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        let expected: Vec<&str> = outcome
            .workload
            .iter()
            .take(entered.len())
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(entered, expected);
    });
}

#[test]
fn admission_waits_for_free_frames() {
    let settings = Settings::default();
    let mut sim = Simulation::build(settings, Policy::Lru, derive_seed(3, Policy::Lru));
    while sim.clock_ms() <= settings.horizon_ms {
        let before = sim.stats().admitted;
        let free_before = sim.memory().free_count();
        sim.step().unwrap();
        if sim.stats().admitted > before {
            assert!(free_before >= settings.min_free_frames);
        }
    }
}

#[test]
fn aggregate_ratio_within_run_bounds() {
    Policy::ALL.iter().for_each(|policy| {
        let mut aggregate = AggregateStatistics::new(*policy);
        (0..NUM_RUNS).for_each(|run| {
            let outcome = Simulation::build(Settings::default(), *policy, derive_seed(run, *policy))
                .run()
                .unwrap();
            let ratio = outcome.stats.hit_ratio();
            assert!((0.0..=1.0).contains(&ratio));
            aggregate.record(outcome.stats);
        });
        let (min, max) = aggregate.ratio_range().unwrap();
        let pooled = aggregate.hit_ratio();
        assert!(min <= pooled && pooled <= max, "{} not in [{}, {}]", pooled, min, max);
    });
}

#[test]
fn starved_process_excluded_from_statistics() {
    // four frames with a threshold of four run one process at a time, at least a second each
    let settings = Settings {
        processes: 60,
        frames: 4,
        min_free_frames: 4,
        horizon_ms: 60_000,
    };
    let outcome = Simulation::build(settings, Policy::Fifo, 1000).run().unwrap();
    assert!(!outcome.never_admitted.is_empty());
    assert_eq!(
        outcome.stats.admitted + outcome.never_admitted.len(),
        settings.processes
    );
    outcome.never_admitted.iter().for_each(|starved| {
        assert!(!outcome.trace.iter().any(|e| match e {
            TraceEvent::Reference { name, .. } | TraceEvent::Admission { name, .. } =>
                name == starved,
        }));
    });
}
