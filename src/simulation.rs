use crate::locality;
use crate::policy::Policy;
use crate::stattrack::RunStatistics;
use crate::trace::{Movement, TraceEvent};
use crate::virtual_memory::{Admission, Memory, Result};
use crate::workload::{generate_workload, Process};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Fixed clock resolution.
pub const STEP_MS: u64 = 10;

/// Every running process references memory once per interval, counted from its start.
pub const REFERENCE_INTERVAL_MS: u64 = 100;

/// Knobs of a single run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub processes: usize,
    pub frames: usize,
    pub min_free_frames: usize,
    pub horizon_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            processes: crate::NUM_PROCESSES,
            frames: crate::TOTAL_FRAMES,
            min_free_frames: crate::MIN_FREE_FRAMES,
            horizon_ms: crate::HORIZON_SECS * 1000,
        }
    }
}

/// Everything a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub policy: Policy,
    pub seed: u64,
    pub stats: RunStatistics,
    pub workload: Vec<Process>,
    pub trace: Vec<TraceEvent>,
    pub never_admitted: Vec<String>,
}

/// The `Simulation` owns all state of one (policy, seed) run: its memory, job queue, random
/// source, counters and trace. Nothing is shared between runs.
pub struct Simulation<R: Rng> {
    settings: Settings,
    policy: Policy,
    seed: u64,
    rng: R,
    memory: Memory,
    waiting: VecDeque<Process>,
    workload: Vec<Process>,
    clock_ms: u64,
    stats: RunStatistics,
    trace: Vec<TraceEvent>,
}

impl Simulation<StdRng> {
    /// Seed a fresh random source and draw the workload from it.
    pub fn build(settings: Settings, policy: Policy, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let workload = generate_workload(&mut rng, settings.processes, settings.horizon_ms);
        Simulation::with_workload(settings, policy, seed, rng, workload)
    }
}

impl<R: Rng> Simulation<R> {
    /// Run a prepared workload. `workload` must already be sorted by arrival.
    pub fn with_workload(
        settings: Settings,
        policy: Policy,
        seed: u64,
        rng: R,
        workload: Vec<Process>,
    ) -> Self {
        Self {
            settings,
            policy,
            seed,
            rng,
            memory: Memory::build(settings.frames),
            waiting: workload.iter().cloned().collect(),
            workload,
            clock_ms: 0,
            stats: RunStatistics::new(),
            trace: Vec::new(),
        }
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn stats(&self) -> RunStatistics {
        self.stats
    }

    pub fn waiting(&self) -> impl Iterator<Item = &Process> + '_ {
        self.waiting.iter()
    }

    pub fn trace(&self) -> &[TraceEvent] {
        &self.trace
    }

    /// Advance the clock by one step: admit what fits, then let each running process either
    /// finish or make its reference, then audit the memory before time moves on.
    pub fn step(&mut self) -> Result<()> {
        let now = self.clock_ms;
        self.admit_arrivals(now);

        for pid in self.memory.running_ids() {
            let (elapsed, service_ms, current, size) = match self.memory.process(pid) {
                Some(p) => (
                    p.elapsed(now).unwrap_or(0),
                    p.service_ms(),
                    p.current_page,
                    p.size_pages,
                ),
                None => continue,
            };

            if elapsed >= service_ms {
                let process = self.memory.release(pid, now)?;
                self.trace.push(TraceEvent::Admission {
                    time_ms: now,
                    name: process.name.clone(),
                    movement: Movement::Exit,
                    size_pages: process.size_pages,
                    service_secs: process.service_secs,
                    memory_map: self.memory.memory_map(),
                });
            } else if elapsed % REFERENCE_INTERVAL_MS == 0 {
                let page = locality::next_page(&mut self.rng, current, size);
                let reference = self
                    .memory
                    .reference(pid, page, now, self.policy, &mut self.rng)?;
                match reference.hit {
                    true => self.stats.hits += 1,
                    false => self.stats.misses += 1,
                }
                self.trace.push(TraceEvent::Reference {
                    time_ms: now,
                    name: format!("P{}", pid),
                    page,
                    hit: reference.hit,
                    evicted: reference.evicted,
                });
            }
        }

        self.memory.audit()?;
        self.clock_ms += STEP_MS;
        Ok(())
    }

    /// Admit waiting processes strictly in arrival order. The first one that has not arrived or
    /// does not fit ends the pass.
    fn admit_arrivals(&mut self, now: u64) {
        while let Some(process) = self.waiting.pop_front() {
            if process.arrival_ms > now {
                self.waiting.push_front(process);
                break;
            }
            let (name, size_pages, service_secs) =
                (process.name.clone(), process.size_pages, process.service_secs);
            match self
                .memory
                .admit(process, now, self.settings.min_free_frames)
            {
                Admission::Admitted => {
                    self.stats.admitted += 1;
                    self.trace.push(TraceEvent::Admission {
                        time_ms: now,
                        name,
                        movement: Movement::Enter,
                        size_pages,
                        service_secs,
                        memory_map: self.memory.memory_map(),
                    });
                }
                Admission::Deferred(process) => {
                    self.waiting.push_front(process);
                    break;
                }
            }
        }
    }

    /// Step until the clock passes the horizon.
    ///
    /// # Errors
    ///
    /// Any invariant violation stops the run and is returned as is.
    pub fn run(mut self) -> Result<RunOutcome> {
        while self.clock_ms <= self.settings.horizon_ms {
            self.step()?;
        }

        let never_admitted: Vec<String> = self.waiting.iter().map(|p| p.name.clone()).collect();
        if !never_admitted.is_empty() {
            warn!(
                "{} seed {}: {} processes never admitted",
                self.policy,
                self.seed,
                never_admitted.len()
            );
        }
        info!(
            "{} seed {}: {} ({} still running at the horizon)",
            self.policy,
            self.seed,
            self.stats,
            self.memory.running_ids().len()
        );

        Ok(RunOutcome {
            policy: self.policy,
            seed: self.seed,
            stats: self.stats,
            workload: self.workload,
            trace: self.trace,
            never_admitted,
        })
    }
}
