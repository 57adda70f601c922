use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::{Index, IndexMut};

/// Sizes (in pages) a generated process may take.
pub const PROCESS_SIZES: [usize; 4] = [5, 11, 17, 31];

/// Service durations in whole seconds.
pub const SERVICE_TIMES: [u64; 5] = [1, 2, 3, 4, 5];

/// The `PageTable` maps every virtual page of a process to the frame currently holding it, or to
/// `None` when the page is not resident. The table is sized once at creation and never grows.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTable {
    entries: Vec<Option<usize>>,
}

impl PageTable {
    pub fn build(size_pages: usize) -> Self {
        Self {
            entries: vec![None; size_pages],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of pages currently mapped to a frame.
    pub fn resident(&self) -> usize {
        self.entries.iter().filter(|x| x.is_some()).count()
    }

    /// Iterate `(page, frame)` pairs for resident pages only.
    pub fn mappings(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(page, frame)| frame.map(|f| (page, f)))
    }

    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|x| *x = None);
    }
}

impl Index<usize> for PageTable {
    type Output = Option<usize>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}

impl IndexMut<usize> for PageTable {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.entries[index]
    }
}

/// A synthetic process. Times are kept in whole milliseconds of simulated time so every run is
/// exact and reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub id: usize,
    pub name: String,
    pub size_pages: usize,
    pub arrival_ms: u64,
    pub service_secs: u64,
    pub start_ms: Option<u64>,
    pub completion_ms: Option<u64>,
    pub current_page: usize,
    pub page_table: PageTable,
    pub pages_in_memory: usize,
}

impl Process {
    pub fn new(id: usize, size_pages: usize, arrival_ms: u64, service_secs: u64) -> Self {
        Self {
            id,
            name: format!("P{}", id),
            size_pages,
            arrival_ms,
            service_secs,
            start_ms: None,
            completion_ms: None,
            current_page: 0,
            page_table: PageTable::build(size_pages),
            pages_in_memory: 0,
        }
    }

    pub fn service_ms(&self) -> u64 {
        self.service_secs * 1000
    }

    /// Milliseconds elapsed since admission, or `None` while the process is still waiting.
    pub fn elapsed(&self, now_ms: u64) -> Option<u64> {
        self.start_ms.map(|start| now_ms.saturating_sub(start))
    }
}

/// Generate `count` processes from the provided random source and return them sorted by arrival
/// time. Ties keep generation order since `sort_by_key` is stable.
///
/// # Arguments
///
/// * `rng` - seeded random source owned by the run.
/// * `count` - number of processes to create.
/// * `horizon_ms` - arrival times are drawn uniformly from `[0, horizon_ms)`.
///
pub fn generate_workload<R: Rng>(rng: &mut R, count: usize, horizon_ms: u64) -> Vec<Process> {
    let mut processes: Vec<Process> = (0..count)
        .map(|id| {
            let size = *PROCESS_SIZES.choose(rng).unwrap_or(&PROCESS_SIZES[0]);
            let arrival = rng.gen_range(0..horizon_ms.max(1));
            let service = *SERVICE_TIMES.choose(rng).unwrap_or(&SERVICE_TIMES[0]);
            Process::new(id, size, arrival, service)
        })
        .collect();
    processes.sort_by_key(|p| p.arrival_ms);
    processes
}
