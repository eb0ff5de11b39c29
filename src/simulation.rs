//! Simulation context: one address space, one pager, one set of counters.

use std::collections::BTreeSet;

use log::info;

use crate::constants::*;
use crate::error::{VmError, VmResult};
use crate::fault::{Pager, Stats};
use crate::memory::{BackingStore, Disk};
use crate::policy::{EvictionPolicy, PolicyKind};
use crate::translation::{Access, Page, PageTable, Translation, VirtualAddress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    pub npages: usize,
    pub nframes: usize,
    pub policy: PolicyKind,
    pub seed: u64,
}

impl SimConfig {
    pub fn new(npages: usize, nframes: usize, policy: PolicyKind) -> Self {
        SimConfig {
            npages,
            nframes,
            policy,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Both counts must be nonzero and their byte sizes must fit a `usize`
    pub fn validate(&self) -> VmResult<()> {
        let fits = |count: usize| count != 0 && count.checked_mul(PAGE_SIZE).is_some();
        if !fits(self.npages) || !fits(self.nframes) {
            return Err(VmError::InvalidGeometry {
                npages: self.npages,
                nframes: self.nframes,
            });
        }
        Ok(())
    }
}

/// One access of a reference string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub page: Page,
    pub access: Access,
}

impl Reference {
    pub fn read(page: Page) -> Self {
        Reference { page, access: Access::Read }
    }

    pub fn write(page: Page) -> Self {
        Reference { page, access: Access::Write }
    }
}

pub struct Simulation {
    page_table: PageTable,
    pager: Pager,
}

impl Simulation {
    /// Build a simulation backed by an in-memory disk
    pub fn new(config: &SimConfig) -> VmResult<Self> {
        config.validate()?;
        Self::with_backing_store(config, Box::new(Disk::new(config.npages)))
    }

    pub fn with_backing_store(config: &SimConfig, disk: Box<dyn BackingStore>) -> VmResult<Self> {
        config.validate()?;
        if disk.npages() < config.npages {
            return Err(VmError::Io {
                message: format!(
                    "backing store holds {} pages, simulation needs {}",
                    disk.npages(),
                    config.npages
                ),
            });
        }

        info!(
            "simulating {} pages over {} frames with the {} policy",
            config.npages, config.nframes, config.policy
        );
        let policy = EvictionPolicy::new(config.policy, config.nframes, config.seed);
        Ok(Simulation {
            page_table: PageTable::new(config.npages, config.nframes),
            pager: Pager::new(config.nframes, policy, disk),
        })
    }

    /// Bytes of virtual memory
    pub fn length(&self) -> usize {
        self.page_table.virtual_size()
    }

    /// Translate `addr`, resolving faults until the access is permitted
    fn resolve(&mut self, addr: usize, access: Access) -> VmResult<usize> {
        let va = VirtualAddress::from_raw(addr);
        loop {
            match self.page_table.translate(&va, access)? {
                Translation::Mapped(pa) => return Ok(pa),
                Translation::Fault(page) => self.pager.handle_fault(&mut self.page_table, page)?,
            }
        }
    }

    pub fn load(&mut self, addr: usize) -> VmResult<u8> {
        let pa = self.resolve(addr, Access::Read)?;
        Ok(self.pager.physmem().read(pa))
    }

    pub fn store(&mut self, addr: usize, value: u8) -> VmResult<()> {
        let pa = self.resolve(addr, Access::Write)?;
        self.pager.physmem_mut().write(pa, value);
        Ok(())
    }

    /// Access the first byte of the referenced page
    pub fn touch(&mut self, reference: Reference) -> VmResult<()> {
        let addr = VirtualAddress::page_base(reference.page).addr;
        self.resolve(addr, reference.access).map(|_| ())
    }

    pub fn run_trace(&mut self, references: &[Reference]) -> VmResult<()> {
        references.iter().try_for_each(|&r| self.touch(r))
    }

    pub fn stats(&self) -> Stats {
        self.pager.stats()
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Verify that the frame table, the page table and (for FIFO) the load
    /// queue all describe the same set of resident pages.
    pub fn check_consistency(&self) -> VmResult<()> {
        let frames = self.pager.frames();
        let inconsistent = |reason: String| -> VmResult<()> { Err(VmError::Inconsistent { reason }) };

        for (frame, entry) in frames.iter().enumerate() {
            match entry.occupant.filter(|_| !entry.is_free()) {
                Some(page) => {
                    let mapping = self.page_table.get_entry(page)?;
                    if mapping.frame != frame || mapping.protection != entry.protection {
                        return inconsistent(format!(
                            "frame {} holds page {} as {:?}, page table says frame {} as {:?}",
                            frame, page, entry.protection, mapping.frame, mapping.protection
                        ));
                    }
                }
                None => {
                    if let Some((page, _)) = self.page_table.mapped().find(|(_, e)| e.frame == frame) {
                        return inconsistent(format!("free frame {} still mapped by page {}", frame, page));
                    }
                }
            }
        }

        for (page, mapping) in self.page_table.mapped() {
            let entry = frames.entry(mapping.frame)?;
            if entry.occupant != Some(page) || entry.protection != mapping.protection {
                return inconsistent(format!(
                    "page {} maps to frame {} which holds {:?}",
                    page, mapping.frame, entry.occupant
                ));
            }
        }

        if frames.occupied_count() > frames.nframes() {
            return inconsistent("more occupied frames than physical frames".into());
        }

        if let Some(queue) = self.pager.policy().fifo_queue() {
            let queued: BTreeSet<_> = queue.iter().collect();
            let occupied: BTreeSet<_> = frames.occupied().map(|(frame, _)| frame).collect();
            if queued.len() != queue.len() || queued != occupied {
                return inconsistent(format!(
                    "fifo queue {:?} does not match occupied frames {:?}",
                    queue.iter().collect::<Vec<_>>(),
                    occupied
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::Protection;

    #[test]
    fn test_geometry_validation() {
        let config = SimConfig::new(0, 4, PolicyKind::Fifo);
        assert_eq!(
            Simulation::new(&config).err(),
            Some(VmError::InvalidGeometry { npages: 0, nframes: 4 })
        );
        let config = SimConfig::new(4, 0, PolicyKind::Custom);
        assert!(Simulation::new(&config).is_err());
    }

    #[test]
    fn test_geometry_overflow_is_rejected() {
        let config = SimConfig::new(usize::MAX / 2, 1, PolicyKind::Fifo);
        assert_eq!(
            Simulation::new(&config).err(),
            Some(VmError::InvalidGeometry { npages: usize::MAX / 2, nframes: 1 })
        );

        let config = SimConfig::new(4, usize::MAX / PAGE_SIZE + 1, PolicyKind::Random);
        assert!(matches!(config.validate(), Err(VmError::InvalidGeometry { .. })));
        assert!(matches!(
            Simulation::with_backing_store(&config, Box::new(Disk::new(4))),
            Err(VmError::InvalidGeometry { .. })
        ));

        // Largest page count whose byte size still fits
        let config = SimConfig::new(usize::MAX / PAGE_SIZE, 1, PolicyKind::Custom);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_direct_eviction_keeps_fifo_consistent() {
        let mut sim = Simulation::new(&SimConfig::new(4, 2, PolicyKind::Fifo)).unwrap();
        sim.run_trace(&[Reference::read(0), Reference::read(1)]).unwrap();

        sim.pager.evict(&mut sim.page_table, 0).unwrap();
        sim.check_consistency().unwrap();

        sim.run_trace(&[Reference::write(2), Reference::read(3)]).unwrap();
        assert_eq!(sim.page_table().get_entry(2).unwrap().frame, 0);
        assert_eq!(sim.page_table().get_entry(1).unwrap().protection, Protection::None);
        sim.check_consistency().unwrap();
    }

    #[test]
    fn test_backing_store_too_small() {
        let config = SimConfig::new(8, 2, PolicyKind::Fifo);
        let result = Simulation::with_backing_store(&config, Box::new(Disk::new(4)));
        assert!(matches!(result, Err(VmError::Io { .. })));
    }

    #[test]
    fn test_store_then_load() {
        let mut sim = Simulation::new(&SimConfig::new(4, 2, PolicyKind::Fifo)).unwrap();
        sim.store(PAGE_SIZE + 3, 42).unwrap();
        assert_eq!(sim.load(PAGE_SIZE + 3).unwrap(), 42);

        // Write miss: load read-only, then upgrade
        let stats = sim.stats();
        assert_eq!(stats.faults, 2);
        assert_eq!(stats.disk_reads, 1);
        sim.check_consistency().unwrap();
    }

    #[test]
    fn test_data_survives_eviction() {
        let mut sim = Simulation::new(&SimConfig::new(4, 1, PolicyKind::Custom)).unwrap();
        for page in 0..4 {
            sim.store(page * PAGE_SIZE + 1, page as u8 + 10).unwrap();
        }
        for page in 0..4 {
            assert_eq!(sim.load(page * PAGE_SIZE + 1).unwrap(), page as u8 + 10);
        }
        sim.check_consistency().unwrap();
    }

    #[test]
    fn test_out_of_range_access() {
        let mut sim = Simulation::new(&SimConfig::new(2, 1, PolicyKind::Random)).unwrap();
        assert!(matches!(
            sim.load(2 * PAGE_SIZE),
            Err(VmError::AddressOutOfRange { .. })
        ));
        assert_eq!(sim.stats().faults, 0);
    }

    #[test]
    fn test_touch_uses_page_base() {
        let mut sim = Simulation::new(&SimConfig::new(4, 4, PolicyKind::Fifo)).unwrap();
        sim.run_trace(&[Reference::read(2), Reference::write(3)]).unwrap();

        assert_eq!(sim.page_table().get_entry(2).unwrap().protection, Protection::Read);
        assert_eq!(sim.page_table().get_entry(3).unwrap().protection, Protection::ReadWrite);
        assert_eq!(sim.stats().faults, 3);
    }

    #[test]
    fn test_consistency_check_catches_stray_mapping() {
        let mut sim = Simulation::new(&SimConfig::new(4, 2, PolicyKind::Custom)).unwrap();
        sim.touch(Reference::read(0)).unwrap();
        sim.check_consistency().unwrap();

        // Map page 3 behind the pager's back
        sim.page_table.set_entry(3, 1, Protection::Read).unwrap();
        assert!(matches!(
            sim.check_consistency(),
            Err(VmError::Inconsistent { .. })
        ));
    }
}
