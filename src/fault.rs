//! Page-fault resolution.
//!
//! [`Pager`] owns the frame table, the eviction policy, physical memory and
//! the backing store. The page table stays with the caller and is passed in
//! on every fault so both tables are updated in the same call.

use log::{debug, trace};

use crate::error::{VmError, VmResult};
use crate::frame_table::FrameTable;
use crate::memory::{BackingStore, PhysicalMemory};
use crate::policy::{EvictionPolicy, VictimSelector};
use crate::translation::{Frame, Page, PageTable, Protection};

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub faults: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
    pub evictions: u64,
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Page Faults: {}", self.faults)?;
        writeln!(f, "Disk Reads: {}", self.disk_reads)?;
        write!(f, "Disk Writes: {}", self.disk_writes)
    }
}

/// What an eviction removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub frame: Frame,
    pub page: Page,
    pub written_back: bool,
}

pub struct Pager {
    frames: FrameTable,
    policy: EvictionPolicy,
    physmem: PhysicalMemory,
    disk: Box<dyn BackingStore>,
    stats: Stats,
}

impl Pager {
    pub fn new(nframes: usize, policy: EvictionPolicy, disk: Box<dyn BackingStore>) -> Self {
        Pager {
            frames: FrameTable::new(nframes),
            policy,
            physmem: PhysicalMemory::new(nframes),
            disk,
            stats: Stats::default(),
        }
    }

    /// Resolve a fault on `page`.
    ///
    /// An unmapped page is loaded read-only into a free or reclaimed frame.
    /// A read-only page is upgraded to read/write in place. A fault on a
    /// read/write page is an invariant violation.
    pub fn handle_fault(&mut self, pt: &mut PageTable, page: Page) -> VmResult<()> {
        self.stats.faults += 1;
        let entry = pt.get_entry(page)?;
        trace!("fault #{} on page {} ({:?})", self.stats.faults, page, entry.protection);

        match entry.protection {
            Protection::None => self.load_page(pt, page),
            Protection::Read => self.upgrade(pt, page, entry.frame),
            Protection::ReadWrite => Err(VmError::WritableFault { page }),
        }
    }

    fn load_page(&mut self, pt: &mut PageTable, page: Page) -> VmResult<()> {
        let frame = match self.frames.find_free_frame() {
            Some(frame) => frame,
            None => {
                let victim = self.policy.select_victim(&self.frames, page)?;
                self.evict(pt, victim)?;
                victim
            }
        };

        self.disk.read(page, self.physmem.frame_mut(frame))?;
        self.stats.disk_reads += 1;
        self.policy.frame_loaded(frame)?;

        pt.set_entry(page, frame, Protection::Read)?;
        self.frames.assign(frame, page, Protection::Read)?;
        trace!("page {} -> frame {} (read-only)", page, frame);
        Ok(())
    }

    fn upgrade(&mut self, pt: &mut PageTable, page: Page, frame: Frame) -> VmResult<()> {
        let current = self.frames.entry(frame)?;
        if current.occupant != Some(page) || current.protection != Protection::Read {
            return Err(VmError::Inconsistent {
                reason: format!(
                    "page {} mapped read-only to frame {}, but the frame holds {:?} ({:?})",
                    page, frame, current.occupant, current.protection
                ),
            });
        }

        pt.set_entry(page, frame, Protection::ReadWrite)?;
        self.frames.assign(frame, page, Protection::ReadWrite)?;
        trace!("page {} in frame {} upgraded to read/write", page, frame);
        Ok(())
    }

    /// Reclaim `frame`: write it back if dirty, unmap its page and mark the
    /// frame free. Must run before the frame is reassigned.
    pub fn evict(&mut self, pt: &mut PageTable, frame: Frame) -> VmResult<Eviction> {
        let entry = self.frames.entry(frame)?;
        let page = entry.occupant.filter(|_| !entry.is_free()).ok_or_else(|| {
            VmError::Inconsistent {
                reason: format!("eviction of free frame {}", frame),
            }
        })?;

        let written_back = entry.is_dirty();
        if written_back {
            self.disk.write(page, self.physmem.frame(frame))?;
            self.stats.disk_writes += 1;
        }

        pt.set_entry(page, frame, Protection::None)?;
        self.frames.release(frame)?;
        self.policy.frame_released(frame);
        self.stats.evictions += 1;

        debug!(
            "evicted page {} from frame {}{}",
            page,
            frame,
            if written_back { " (written back)" } else { "" }
        );
        Ok(Eviction {
            frame,
            page,
            written_back,
        })
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    pub fn physmem(&self) -> &PhysicalMemory {
        &self.physmem
    }

    pub fn physmem_mut(&mut self) -> &mut PhysicalMemory {
        &mut self.physmem
    }

    pub fn disk_mut(&mut self) -> &mut dyn BackingStore {
        self.disk.as_mut()
    }
}
