use crate::policy::Policy;
use crate::table::FrameTable;
use crate::workload::Process;
use linked_hash_map::LinkedHashMap;
use log::{debug, trace};
use rand::Rng;
use std::fmt;

/// Type Alias: A rebranding of the `Result` enum from the standard library which focuses on the
/// invariant violations this module can detect. None of them are recoverable; a run that sees
/// one must stop.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A fault needed a victim but no frame was occupied.
    NoVictimAvailable { time_ms: u64 },
    /// A frame and a page table disagree about who owns what.
    PageTableInconsistency {
        frame: usize,
        pid: usize,
        page: usize,
    },
    /// An operation named a process that is not running.
    UnknownProcess { pid: usize },
    /// Free frames plus resident pages no longer add up to the frame pool.
    ConservationViolated {
        free: usize,
        resident: usize,
        total: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoVictimAvailable { time_ms } => {
                write!(f, "page fault at {}ms found no victim frame", time_ms)
            }
            Error::PageTableInconsistency { frame, pid, page } => write!(
                f,
                "frame {} and page table of process {} disagree on page {}",
                frame, pid, page
            ),
            Error::UnknownProcess { pid } => write!(f, "process {} is not running", pid),
            Error::ConservationViolated {
                free,
                resident,
                total,
            } => write!(
                f,
                "{} free frames + {} resident pages != {} frames",
                free, resident, total
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Outcome of an admission attempt. Deferral is ordinary backpressure and hands the process back
/// to the caller untouched.
#[derive(Debug)]
pub enum Admission {
    Admitted,
    Deferred(Process),
}

/// The page pushed out of memory to make room for a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub pid: usize,
    pub page: usize,
}

impl fmt::Display for Eviction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.pid, self.page)
    }
}

/// The `Reference` encodes how a single memory reference was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub frame: usize,
    pub hit: bool,
    pub evicted: Option<Eviction>,
}

/// The `Memory` struct pairs the frame table with the processes currently running against it.
/// Every mutation keeps the two sides in agreement: a resident page points at exactly one frame
/// and that frame names the same process and page back.
pub struct Memory {
    frames: FrameTable,
    running: LinkedHashMap<usize, Process>,
}

impl Memory {
    pub fn build(frame_count: usize) -> Self {
        Self {
            frames: FrameTable::build(frame_count),
            running: LinkedHashMap::new(),
        }
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    pub fn free_count(&self) -> usize {
        self.frames.free_count()
    }

    pub fn process(&self, pid: usize) -> Option<&Process> {
        self.running.get(&pid)
    }

    /// Ids of running processes in admission order.
    pub fn running_ids(&self) -> Vec<usize> {
        self.running.keys().copied().collect()
    }

    pub fn resident_pages(&self) -> usize {
        self.running.values().map(|p| p.pages_in_memory).sum()
    }

    /// Start `process` if at least `min_free` frames are free, loading its page 0 into the lowest
    /// free frame.
    pub fn admit(&mut self, mut process: Process, now_ms: u64, min_free: usize) -> Admission {
        if self.frames.free_count() < min_free {
            return Admission::Deferred(process);
        }
        let frame = match self.frames.allocate_free_frame() {
            Some(frame) => frame,
            None => return Admission::Deferred(process),
        };
        self.frames.mark_occupied(frame, process.id, 0, now_ms);
        process.page_table[0] = Some(frame);
        process.pages_in_memory = 1;
        process.current_page = 0;
        process.start_ms = Some(now_ms);
        debug!(
            "{:>6}ms admit {} ({} pages, {}s) into frame {}",
            now_ms, process.name, process.size_pages, process.service_secs, frame
        );
        self.running.insert(process.id, process);
        Admission::Admitted
    }

    /// Resolve a reference by process `pid` to `page`. A hit refreshes the frame's recency and
    /// frequency data. A miss takes the lowest free frame, or failing that evicts the victim
    /// `policy` picks and hands its frame straight to the faulting page.
    ///
    /// # Errors
    ///
    /// Fails if `pid` is not running, if no victim exists when one is needed, or if the frame
    /// table and a page table are found to disagree. Checks run before anything is mutated.
    pub fn reference<R: Rng>(
        &mut self,
        pid: usize,
        page: usize,
        now_ms: u64,
        policy: Policy,
        rng: &mut R,
    ) -> Result<Reference> {
        let mapped = self
            .running
            .get(&pid)
            .ok_or(Error::UnknownProcess { pid })?
            .page_table[page];

        if let Some(frame) = mapped {
            self.expect_owner(frame, pid, page)?;
            self.frames.touch(frame, now_ms);
            self.set_current_page(pid, page)?;
            trace!("{:>6}ms P{} page {} hit in frame {}", now_ms, pid, page, frame);
            return Ok(Reference {
                frame,
                hit: true,
                evicted: None,
            });
        }

        let (frame, evicted) = match self.frames.allocate_free_frame() {
            Some(frame) => {
                self.frames.mark_occupied(frame, pid, page, now_ms);
                (frame, None)
            }
            None => {
                let victim = policy
                    .select_victim(&self.frames, rng)
                    .ok_or(Error::NoVictimAvailable { time_ms: now_ms })?;
                let occupant = self.frames[victim]
                    .occupant
                    .ok_or(Error::NoVictimAvailable { time_ms: now_ms })?;
                let owner = self
                    .running
                    .get_mut(&occupant.pid)
                    .filter(|o| o.page_table[occupant.page] == Some(victim))
                    .ok_or(Error::PageTableInconsistency {
                        frame: victim,
                        pid: occupant.pid,
                        page: occupant.page,
                    })?;
                owner.page_table[occupant.page] = None;
                owner.pages_in_memory -= 1;
                self.frames.reassign(victim, pid, page, now_ms);
                let eviction = Eviction {
                    pid: occupant.pid,
                    page: occupant.page,
                };
                debug!(
                    "{:>6}ms {} evicts {} from frame {} for P{} page {}",
                    now_ms, policy, eviction, victim, pid, page
                );
                (victim, Some(eviction))
            }
        };

        let process = self
            .running
            .get_mut(&pid)
            .ok_or(Error::UnknownProcess { pid })?;
        process.page_table[page] = Some(frame);
        process.pages_in_memory += 1;
        process.current_page = page;
        trace!("{:>6}ms P{} page {} miss into frame {}", now_ms, pid, page, frame);
        Ok(Reference {
            frame,
            hit: false,
            evicted,
        })
    }

    /// Finish process `pid`: free every frame it holds and hand the process back.
    pub fn release(&mut self, pid: usize, now_ms: u64) -> Result<Process> {
        let mut process = self
            .running
            .remove(&pid)
            .ok_or(Error::UnknownProcess { pid })?;
        for (page, frame) in process.page_table.mappings() {
            match self.frames.free(frame) {
                Some(o) if o.pid == pid && o.page == page => {}
                _ => return Err(Error::PageTableInconsistency { frame, pid, page }),
            }
        }
        process.page_table.clear();
        process.pages_in_memory = 0;
        process.completion_ms = Some(now_ms);
        debug!(
            "{:>6}ms exit {}, {} frames free",
            now_ms,
            process.name,
            self.frames.free_count()
        );
        Ok(process)
    }

    /// Verify conservation and that every resident page and every occupied frame point at each
    /// other.
    pub fn audit(&self) -> Result<()> {
        let resident = self.resident_pages();
        let total = self.frames.capacity();
        let free = self.frames.free_count();
        if free + resident != total || self.frames.occupied().count() != resident {
            return Err(Error::ConservationViolated {
                free,
                resident,
                total,
            });
        }
        for process in self.running.values() {
            if process.page_table.resident() != process.pages_in_memory
                || process.pages_in_memory > process.size_pages
            {
                return Err(Error::ConservationViolated {
                    free,
                    resident,
                    total,
                });
            }
            for (page, frame) in process.page_table.mappings() {
                self.expect_owner(frame, process.id, page)?;
            }
        }
        for (frame, occupant) in self.frames.occupied() {
            let mapped = self
                .running
                .get(&occupant.pid)
                .filter(|p| occupant.page < p.page_table.len())
                .and_then(|p| p.page_table[occupant.page]);
            if mapped != Some(frame) {
                return Err(Error::PageTableInconsistency {
                    frame,
                    pid: occupant.pid,
                    page: occupant.page,
                });
            }
        }
        Ok(())
    }

    /// One character per frame: `.` when free, otherwise a symbol derived from the owner's id.
    pub fn memory_map(&self) -> String {
        const SYMBOLS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
        (0..self.frames.capacity())
            .map(|index| match self.frames[index].occupant {
                Some(o) => SYMBOLS[o.pid % SYMBOLS.len()] as char,
                None => '.',
            })
            .collect()
    }

    fn expect_owner(&self, frame: usize, pid: usize, page: usize) -> Result<()> {
        match self.frames[frame].occupant {
            Some(o) if o.pid == pid && o.page == page => Ok(()),
            _ => Err(Error::PageTableInconsistency { frame, pid, page }),
        }
    }

    fn set_current_page(&mut self, pid: usize, page: usize) -> Result<()> {
        let process = self
            .running
            .get_mut(&pid)
            .ok_or(Error::UnknownProcess { pid })?;
        process.current_page = page;
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    #[cfg(test)]
    mod admission_tests {

        use super::*;

        #[test]
        fn admit_loads_page_zero() {
            let mut memory = Memory::build(10);
            let admission = memory.admit(Process::new(3, 5, 0, 2), 40, 4);
            assert!(matches!(admission, Admission::Admitted));

            let process = memory.process(3).unwrap();
            assert_eq!(process.start_ms, Some(40));
            assert_eq!(process.page_table[0], Some(0));
            assert_eq!(process.pages_in_memory, 1);
            assert_eq!(memory.free_count(), 9);
            memory.audit().unwrap();
        }

        #[test]
        fn deferred_below_threshold() {
            let mut memory = Memory::build(4);
            assert!(matches!(
                memory.admit(Process::new(0, 5, 0, 1), 0, 4),
                Admission::Admitted
            ));
            match memory.admit(Process::new(1, 5, 0, 1), 0, 4) {
                Admission::Deferred(process) => {
                    assert_eq!(process.id, 1);
                    assert_eq!(process.start_ms, None);
                }
                Admission::Admitted => panic!("admitted with 3 free frames"),
            }
            assert_eq!(memory.running_ids(), vec![0]);
        }
    }

    #[cfg(test)]
    mod reference_tests {

        use super::*;

        #[test]
        fn hit_touches_frame() {
            let mut memory = Memory::build(8);
            memory.admit(Process::new(0, 5, 0, 1), 0, 4);
            let result = memory.reference(0, 0, 100, Policy::Lru, &mut rng()).unwrap();
            assert_eq!(
                result,
                Reference {
                    frame: 0,
                    hit: true,
                    evicted: None
                }
            );
            let occupant = memory.frames()[0].occupant.unwrap();
            assert_eq!(occupant.last_access_ms, 100);
            assert_eq!(occupant.access_count, 2);
        }

        #[test]
        fn miss_uses_free_frame() {
            let mut memory = Memory::build(8);
            memory.admit(Process::new(0, 5, 0, 1), 0, 4);
            let result = memory.reference(0, 3, 100, Policy::Fifo, &mut rng()).unwrap();
            assert!(!result.hit);
            assert_eq!(result.frame, 1);
            assert_eq!(result.evicted, None);
            assert_eq!(memory.process(0).unwrap().current_page, 3);
            assert_eq!(memory.free_count(), 6);
            memory.audit().unwrap();
        }

        #[test]
        fn unknown_process() {
            let mut memory = Memory::build(8);
            assert_eq!(
                memory.reference(9, 0, 0, Policy::Fifo, &mut rng()),
                Err(Error::UnknownProcess { pid: 9 })
            );
        }

        #[test]
        fn eviction_crosses_processes() {
            let mut memory = Memory::build(4);
            let mut rng = rng();
            memory.admit(Process::new(0, 11, 0, 5), 0, 4);
            memory.reference(0, 1, 100, Policy::Fifo, &mut rng).unwrap();
            memory.reference(0, 2, 200, Policy::Fifo, &mut rng).unwrap();
            memory.reference(0, 3, 300, Policy::Fifo, &mut rng).unwrap();
            assert_eq!(memory.free_count(), 0);

            let result = memory.reference(0, 4, 400, Policy::Fifo, &mut rng).unwrap();
            assert_eq!(result.frame, 0);
            assert_eq!(result.evicted, Some(Eviction { pid: 0, page: 0 }));
            let process = memory.process(0).unwrap();
            assert_eq!(process.page_table[0], None);
            assert_eq!(process.page_table[4], Some(0));
            assert_eq!(process.pages_in_memory, 4);
            assert_eq!(memory.free_count(), 0);
            memory.audit().unwrap();
        }

        /// Six frames, a resident neighbour holding two of them, and a five page process walking
        /// 2, 1, 0, 4, 3 under FIFO. The fifth distinct page is the first that cannot find a free
        /// frame and must evict the oldest load, lowest index first.
        #[test]
        fn fifo_scenario() {
            let mut memory = Memory::build(6);
            let mut rng = rng();
            memory.admit(Process::new(1, 11, 0, 5), 0, 4);
            memory.reference(1, 1, 0, Policy::Fifo, &mut rng).unwrap();
            assert_eq!(memory.free_count(), 4);

            memory.admit(Process::new(0, 5, 0, 5), 0, 4);
            let walk = [(2, 100), (1, 200), (0, 300), (4, 400), (3, 500)];
            let results: Vec<Reference> = walk
                .iter()
                .map(|(page, t)| memory.reference(0, *page, *t, Policy::Fifo, &mut rng).unwrap())
                .collect();

            let evictions: Vec<Eviction> = results.iter().filter_map(|r| r.evicted).collect();
            assert_eq!(evictions, vec![Eviction { pid: 1, page: 0 }]);
            assert_eq!(results[4].frame, 0);
            assert!(results[2].hit);
            assert_eq!(memory.process(1).unwrap().page_table[0], None);
            assert_eq!(memory.free_count(), 0);
            memory.audit().unwrap();
        }
    }

    #[cfg(test)]
    mod release_tests {

        use super::*;

        #[test]
        fn release_frees_everything() {
            let mut memory = Memory::build(8);
            let mut rng = rng();
            memory.admit(Process::new(0, 5, 0, 1), 0, 4);
            memory.admit(Process::new(1, 5, 0, 1), 0, 4);
            memory.reference(0, 1, 100, Policy::Lfu, &mut rng).unwrap();
            memory.reference(0, 2, 200, Policy::Lfu, &mut rng).unwrap();

            let process = memory.release(0, 1_000).unwrap();
            assert_eq!(process.completion_ms, Some(1_000));
            assert_eq!(process.pages_in_memory, 0);
            assert_eq!(process.page_table.resident(), 0);
            assert_eq!(memory.free_count(), 7);
            assert_eq!(memory.running_ids(), vec![1]);
            memory.audit().unwrap();
        }

        #[test]
        fn release_unknown() {
            let mut memory = Memory::build(8);
            assert!(matches!(
                memory.release(4, 0),
                Err(Error::UnknownProcess { pid: 4 })
            ));
        }
    }

    #[cfg(test)]
    mod audit_tests {

        use super::*;

        #[test]
        fn detects_dangling_page_table_entry() {
            let mut memory = Memory::build(8);
            memory.admit(Process::new(0, 5, 0, 1), 0, 4);
            if let Some(process) = memory.running.get_mut(&0) {
                process.page_table[2] = Some(5);
                process.pages_in_memory = 2;
            }
            assert!(memory.audit().is_err());
        }

        #[test]
        fn detects_orphan_frame() {
            let mut memory = Memory::build(8);
            memory.admit(Process::new(0, 5, 0, 1), 0, 4);
            memory.frames.mark_occupied(6, 0, 3, 0);
            assert!(memory.audit().is_err());
        }

        #[test]
        fn detects_swapped_mapping() {
            let mut memory = Memory::build(8);
            let mut rng = rng();
            memory.admit(Process::new(0, 5, 0, 1), 0, 4);
            memory.reference(0, 1, 100, Policy::Fifo, &mut rng).unwrap();
            if let Some(process) = memory.running.get_mut(&0) {
                process.page_table[0] = Some(1);
                process.page_table[1] = Some(0);
            }
            assert!(matches!(
                memory.audit(),
                Err(Error::PageTableInconsistency { .. })
            ));
            assert!(matches!(
                memory.reference(0, 0, 200, Policy::Fifo, &mut rng),
                Err(Error::PageTableInconsistency { .. })
            ));
        }
    }

    #[test]
    fn memory_map() {
        let mut memory = Memory::build(6);
        memory.admit(Process::new(1, 5, 0, 1), 0, 4);
        memory.admit(Process::new(11, 5, 0, 1), 0, 4);
        assert_eq!(memory.memory_map(), "1B....");
    }
}
