use crate::table::{FrameTable, Occupant};
use clap::ValueEnum;
use rand::Rng;
use std::cmp::Reverse;
use std::fmt;

/// The closed set of page replacement policies compared by the simulation. Declaration order is
/// the fixed policy order used for seed derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Policy {
    Fifo,
    Lru,
    Lfu,
    Mfu,
    Random,
}

impl Policy {
    pub const ALL: [Policy; 5] = [
        Policy::Fifo,
        Policy::Lru,
        Policy::Lfu,
        Policy::Mfu,
        Policy::Random,
    ];

    /// Position in the fixed order FIFO=0, LRU=1, LFU=2, MFU=3, RANDOM=4.
    pub fn index(self) -> usize {
        match self {
            Policy::Fifo => 0,
            Policy::Lru => 1,
            Policy::Lfu => 2,
            Policy::Mfu => 3,
            Policy::Random => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Policy::Fifo => "FIFO",
            Policy::Lru => "LRU",
            Policy::Lfu => "LFU",
            Policy::Mfu => "MFU",
            Policy::Random => "RANDOM",
        }
    }

    /// Pick the frame to evict among the occupied frames of `frames`. Deterministic policies
    /// break ties on the lowest frame index; `Random` draws uniformly from `rng`. Returns `None`
    /// only when nothing is occupied.
    ///
    /// # Arguments
    ///
    /// * `frames` - the frame table as it stands at the moment of the fault.
    /// * `rng` - the run's random source; only `Random` consumes from it.
    ///
    pub fn select_victim<R: Rng>(self, frames: &FrameTable, rng: &mut R) -> Option<usize> {
        match self {
            Policy::Fifo => first_min(frames, |o| o.load_ms),
            Policy::Lru => first_min(frames, |o| o.last_access_ms),
            Policy::Lfu => first_min(frames, |o| o.access_count),
            Policy::Mfu => first_min(frames, |o| Reverse(o.access_count)),
            Policy::Random => {
                let candidates: Vec<usize> = frames.occupied().map(|(index, _)| index).collect();
                match candidates.len() {
                    0 => None,
                    n => Some(candidates[rng.gen_range(0..n)]),
                }
            }
        }
    }
}

// min_by_key keeps the first of several equal keys, which is the lowest frame index.
fn first_min<K: Ord>(frames: &FrameTable, key: impl Fn(&Occupant) -> K) -> Option<usize> {
    frames
        .occupied()
        .min_by_key(|(_, occupant)| key(*occupant))
        .map(|(index, _)| index)
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
