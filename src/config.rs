use crate::policy::Policy;
use crate::simulation::Settings;
use clap::{Parser, ValueEnum};
use std::env;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Independent runs per policy.
    #[arg(long, default_value_t = env_or_default("SIM_RUNS", crate::NUM_RUNS))]
    pub runs: usize,

    #[arg(long, default_value_t = env_or_default("SIM_PROCESSES", crate::NUM_PROCESSES))]
    pub processes: usize,

    #[arg(long, default_value_t = env_or_default("SIM_FRAMES", crate::TOTAL_FRAMES))]
    pub frames: usize,

    /// Free frames required before a waiting process is started.
    #[arg(long, default_value_t = env_or_default("SIM_MIN_FREE_FRAMES", crate::MIN_FREE_FRAMES))]
    pub min_free_frames: usize,

    #[arg(long, default_value_t = env_or_default("SIM_DURATION_SECS", crate::HORIZON_SECS))]
    pub duration_secs: u64,

    /// Reference lines printed from the baseline run.
    #[arg(long, default_value_t = env_or_default("SIM_TRACE_REFERENCES", 100))]
    pub trace_references: usize,

    /// Enter/Exit lines printed from the baseline run.
    #[arg(long, default_value_t = env_or_default("SIM_TRACE_ADMISSIONS", 10))]
    pub trace_admissions: usize,

    /// Policy whose first run is traced.
    #[arg(long, value_enum, default_value_t = baseline_from_env())]
    pub baseline_policy: Policy,

    /// Hide the progress bar.
    #[arg(long)]
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runs: crate::NUM_RUNS,
            processes: crate::NUM_PROCESSES,
            frames: crate::TOTAL_FRAMES,
            min_free_frames: crate::MIN_FREE_FRAMES,
            duration_secs: crate::HORIZON_SECS,
            trace_references: 100,
            trace_admissions: 10,
            baseline_policy: Policy::Fifo,
            quiet: true,
        }
    }
}

impl Config {
    /// Check the configuration for values the simulation cannot run with and describe the first
    /// problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.runs == 0 || self.processes == 0 {
            Err(String::from("'runs' and 'processes' must be non-zero"))
        } else if self.frames == 0 {
            Err(String::from("'frames' must be non-zero"))
        } else if self.min_free_frames == 0 || self.min_free_frames > self.frames {
            Err(String::from(
                "'min_free_frames' must be a non-zero value no greater than 'frames'",
            ))
        } else if self.duration_secs == 0 {
            Err(String::from("'duration_secs' must be non-zero"))
        } else {
            Ok(())
        }
    }

    pub fn display(&self) {
        println!("simulation configuration values: ");
        println!("{:#?}", self);
    }

    pub fn settings(&self) -> Settings {
        Settings {
            processes: self.processes,
            frames: self.frames,
            min_free_frames: self.min_free_frames,
            horizon_ms: self.duration_secs * 1000,
        }
    }
}

fn env_or_default<T: std::str::FromStr>(varname: &str, default: T) -> T {
    match env::var(varname) {
        Ok(val) => val.parse().unwrap_or_else(|_| {
            eprintln!("ignoring unparsable value for env var '{}'", varname);
            default
        }),
        _ => default,
    }
}

fn baseline_from_env() -> Policy {
    match env::var("SIM_BASELINE_POLICY") {
        Ok(val) => Policy::from_str(&val, true).unwrap_or(Policy::Fifo),
        _ => Policy::Fifo,
    }
}
