use std::ops::Index;

/// Bookkeeping for a frame holding a page. `access_count` starts at one since loading a page
/// is itself an access.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occupant {
    pub pid: usize,
    pub page: usize,
    pub load_ms: u64,
    pub last_access_ms: u64,
    pub access_count: u64,
}

impl Occupant {
    fn new(pid: usize, page: usize, now_ms: u64) -> Self {
        Self {
            pid,
            page,
            load_ms: now_ms,
            last_access_ms: now_ms,
            access_count: 1,
        }
    }
}

/// A single physical frame; `None` when free.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Frame {
    pub occupant: Option<Occupant>,
}

impl Frame {
    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}

/// The `FrameTable` is the fixed pool of physical frames shared by every process of a run. Free
/// frames are found by a linear scan from index zero, so allocation always hands out the lowest
/// free index and a run is fully determined by its seed.
#[derive(Debug, Clone)]
pub struct FrameTable {
    entries: Vec<Frame>,
    free_count: usize,
}

impl FrameTable {
    pub fn build(table_size: usize) -> Self {
        Self {
            entries: vec![Frame::default(); table_size],
            free_count: table_size,
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_count
    }

    /// Find a free frame without claiming it. The caller follows up with `mark_occupied`.
    pub fn allocate_free_frame(&self) -> Option<usize> {
        if self.free_count == 0 {
            return None;
        }
        self.entries.iter().position(Frame::is_free)
    }

    /// Claim a free frame for `(pid, page)`.
    ///
    /// # Panics
    ///
    /// Panics if the frame is already occupied; handing out an occupied frame breaks the free
    /// count and is a bug in the caller.
    pub fn mark_occupied(&mut self, index: usize, pid: usize, page: usize, now_ms: u64) {
        let frame = &mut self.entries[index];
        assert!(frame.is_free(), "frame {} is already occupied", index);
        frame.occupant = Some(Occupant::new(pid, page, now_ms));
        self.free_count -= 1;
    }

    /// Record a hit on the frame.
    pub fn touch(&mut self, index: usize, now_ms: u64) {
        if let Some(occupant) = self.entries[index].occupant.as_mut() {
            occupant.last_access_ms = now_ms;
            occupant.access_count += 1;
        }
    }

    /// Release the frame and return whoever held it.
    pub fn free(&mut self, index: usize) -> Option<Occupant> {
        let previous = self.entries[index].occupant.take();
        if previous.is_some() {
            self.free_count += 1;
        }
        previous
    }

    /// Evict the occupant of `index` and load `(pid, page)` in its place as one step. The free
    /// count never moves, so the frame is never observable as free in between.
    pub fn reassign(&mut self, index: usize, pid: usize, page: usize, now_ms: u64) -> Option<Occupant> {
        let frame = &mut self.entries[index];
        let previous = frame.occupant.replace(Occupant::new(pid, page, now_ms));
        if previous.is_none() {
            self.free_count -= 1;
        }
        previous
    }

    /// Iterate `(index, occupant)` over occupied frames in index order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &Occupant)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, frame)| frame.occupant.as_ref().map(|o| (index, o)))
    }
}

impl Index<usize> for FrameTable {
    type Output = Frame;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}
