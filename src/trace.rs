use crate::virtual_memory::Eviction;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Enter,
    Exit,
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Movement::Enter => write!(f, "Enter"),
            Movement::Exit => write!(f, "Exit"),
        }
    }
}

/// Events a run emits for the reporter, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    Reference {
        time_ms: u64,
        name: String,
        page: usize,
        hit: bool,
        evicted: Option<Eviction>,
    },
    Admission {
        time_ms: u64,
        name: String,
        movement: Movement,
        size_pages: usize,
        service_secs: u64,
        memory_map: String,
    },
}

impl TraceEvent {
    pub fn is_reference(&self) -> bool {
        matches!(self, TraceEvent::Reference { .. })
    }
}

fn seconds(time_ms: u64) -> String {
    format!("{}.{:03}", time_ms / 1000, time_ms % 1000)
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Reference {
                time_ms,
                name,
                page,
                hit,
                evicted,
            } => write!(
                f,
                "{:>7}s {:<5} page {:>2} {:<4} {}",
                seconds(*time_ms),
                name,
                page,
                if *hit { "hit" } else { "miss" },
                evicted.map(|e| e.to_string()).unwrap_or_default(),
            ),
            TraceEvent::Admission {
                time_ms,
                name,
                movement,
                size_pages,
                service_secs,
                memory_map,
            } => write!(
                f,
                "{:>7}s {:<5} {:<5} {:>2} pages {}s <{}>",
                seconds(*time_ms),
                name,
                movement,
                size_pages,
                service_secs,
                memory_map,
            ),
        }
    }
}
