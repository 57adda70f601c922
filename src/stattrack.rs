use crate::policy::Policy;
use std::ops::{Add, AddAssign};

/// Counters for a single run. Processes that never get admitted touch none of them.
#[derive(Debug, PartialEq, Copy, Clone, Default)]
pub struct RunStatistics {
    pub hits: usize,
    pub misses: usize,
    pub admitted: usize,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn references(&self) -> usize {
        self.hits + self.misses
    }

    /// Hits over references; zero when nothing was referenced.
    pub fn hit_ratio(&self) -> f64 {
        match self.references() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }
}

impl Add<RunStatistics> for RunStatistics {
    type Output = RunStatistics;

    fn add(self, rhs: RunStatistics) -> Self::Output {
        Self::Output {
            hits: self.hits + rhs.hits,
            misses: self.misses + rhs.misses,
            admitted: self.admitted + rhs.admitted,
        }
    }
}

impl AddAssign for RunStatistics {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.add(rhs)
    }
}

impl std::fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hits: {:06}  misses: {:06}  hit ratio: {:.04}  admitted: {:04}",
            self.hits,
            self.misses,
            self.hit_ratio(),
            self.admitted,
        )
    }
}

/// The runs of one policy taken together. The hit ratio is pooled over every reference of every
/// run rather than averaged per run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateStatistics {
    pub policy: Policy,
    pub runs: Vec<RunStatistics>,
}

impl AggregateStatistics {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            runs: Vec::new(),
        }
    }

    pub fn record(&mut self, run: RunStatistics) {
        self.runs.push(run);
    }

    pub fn total(&self) -> RunStatistics {
        self.runs
            .iter()
            .fold(RunStatistics::new(), |acc, run| acc + *run)
    }

    pub fn hit_ratio(&self) -> f64 {
        self.total().hit_ratio()
    }

    pub fn average_admitted(&self) -> f64 {
        match self.runs.len() {
            0 => 0.0,
            n => self.total().admitted as f64 / n as f64,
        }
    }

    /// Smallest and largest per-run ratio, `None` without runs.
    pub fn ratio_range(&self) -> Option<(f64, f64)> {
        let ratios = self.runs.iter().map(RunStatistics::hit_ratio);
        let min = ratios.clone().reduce(f64::min)?;
        let max = ratios.reduce(f64::max)?;
        Some((min, max))
    }
}

impl std::fmt::Display for AggregateStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<7} hit ratio: {:.04}  average admitted: {:.01}",
            self.policy.name(),
            self.hit_ratio(),
            self.average_admitted(),
        )
    }
}
