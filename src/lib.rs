pub mod config;
pub mod locality;
pub mod policy;
pub mod simulation;
pub mod stattrack;
pub mod table;
pub mod trace;
pub mod virtual_memory;
pub mod workload;

use config::Config;
use indicatif::ProgressBar;
use log::info;
use policy::Policy;
use simulation::{RunOutcome, Simulation};
use stattrack::AggregateStatistics;
use std::fmt::Write;
use trace::TraceEvent;

pub const NUM_RUNS: usize = 5;
pub const NUM_PROCESSES: usize = 150;
pub const TOTAL_FRAMES: usize = 100;
pub const MIN_FREE_FRAMES: usize = 4;
pub const HORIZON_SECS: u64 = 60;

/// Seed for run `run_index` of `policy`. Distinct for every pair of the 5 x 5 grid.
pub fn derive_seed(run_index: usize, policy: Policy) -> u64 {
    1000 + run_index as u64 * 100 + policy.index() as u64 * 500
}

/// The results of every (policy, run) pair plus the per-policy aggregates. Only the baseline run,
/// the first run of the baseline policy, keeps its trace.
pub struct Experiment {
    pub outcomes: Vec<RunOutcome>,
    pub aggregates: Vec<AggregateStatistics>,
    baseline: Option<usize>,
}

impl Experiment {
    pub fn baseline(&self) -> Option<&RunOutcome> {
        self.baseline.and_then(|index| self.outcomes.get(index))
    }
}

/// Run every policy `config.runs` times, each run on its own seed, memory and random source.
///
/// # Errors
///
/// The first invariant violation in any run aborts the experiment.
pub fn run_experiment(config: &Config) -> virtual_memory::Result<Experiment> {
    let settings = config.settings();
    let progress = match config.quiet {
        true => ProgressBar::hidden(),
        false => ProgressBar::new((Policy::ALL.len() * config.runs) as u64),
    };

    let mut outcomes = Vec::with_capacity(Policy::ALL.len() * config.runs);
    let mut aggregates = Vec::with_capacity(Policy::ALL.len());
    let mut baseline = None;
    for policy in Policy::ALL {
        let mut aggregate = AggregateStatistics::new(policy);
        for run_index in 0..config.runs {
            let seed = derive_seed(run_index, policy);
            let mut outcome = Simulation::build(settings, policy, seed).run()?;
            if policy == config.baseline_policy && run_index == 0 {
                baseline = Some(outcomes.len());
            } else {
                outcome.trace.clear();
            }
            aggregate.record(outcome.stats);
            outcomes.push(outcome);
            progress.inc(1);
        }
        info!("{}", aggregate);
        aggregates.push(aggregate);
    }
    progress.finish_and_clear();

    Ok(Experiment {
        outcomes,
        aggregates,
        baseline,
    })
}

/// Render the human readable report of an experiment.
pub fn report(config: &Config, experiment: &Experiment) -> String {
    let mut out = String::new();

    if let Some(baseline) = experiment.baseline() {
        let _ = writeln!(
            out,
            "\nWorkload ({} run 0, seed {})\nName\tArrival\tSize\tService\n{}",
            baseline.policy,
            baseline.seed,
            "-".repeat(40)
        );
        for p in &baseline.workload {
            let _ = writeln!(
                out,
                "{}\t{:.2}\t{}\t{}",
                p.name,
                p.arrival_ms as f64 / 1000.0,
                p.size_pages,
                p.service_secs
            );
        }

        let _ = writeln!(out, "\nAdmissions\n{}", "-".repeat(40));
        baseline
            .trace
            .iter()
            .filter(|e| matches!(e, TraceEvent::Admission { .. }))
            .take(config.trace_admissions)
            .for_each(|e| {
                let _ = writeln!(out, "{}", e);
            });

        let _ = writeln!(out, "\nReferences\n{}", "-".repeat(40));
        baseline
            .trace
            .iter()
            .filter(|e| e.is_reference())
            .take(config.trace_references)
            .for_each(|e| {
                let _ = writeln!(out, "{}", e);
            });
    }

    let _ = writeln!(out, "\nRuns\n{}", "-".repeat(40));
    for outcome in &experiment.outcomes {
        let _ = writeln!(
            out,
            "{:<7} seed {:>5}  {}",
            outcome.policy.name(),
            outcome.seed,
            outcome.stats
        );
    }

    let _ = writeln!(out, "\nAverages over {} runs\n{}", config.runs, "-".repeat(40));
    for aggregate in &experiment.aggregates {
        let _ = writeln!(out, "{}", aggregate);
    }
    out
}
