#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use virtmem::{Frame, Page, PolicyKind, Protection, Reference, SimConfig, Simulation};

pub fn simulation(npages: usize, nframes: usize, policy: PolicyKind) -> Simulation {
    Simulation::new(&SimConfig::new(npages, nframes, policy).with_seed(1234)).unwrap()
}

/// Pseudo-random reference string over `npages`, roughly one write in three
pub fn random_trace(npages: usize, len: usize, seed: u64) -> Vec<Reference> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let page = rng.random_range(0..npages);
            if rng.random_range(0..3) == 0 {
                Reference::write(page)
            } else {
                Reference::read(page)
            }
        })
        .collect()
}

/// True when touching `reference` has to reclaim an occupied frame
pub fn needs_eviction(sim: &Simulation, reference: Reference) -> bool {
    let unmapped = sim.page_table().get_entry(reference.page).unwrap().protection == Protection::None;
    unmapped && sim.pager().frames().find_free_frame().is_none()
}

/// Occupant and protection of every frame, indexed by frame
pub fn snapshot(sim: &Simulation) -> Vec<(Option<Page>, Protection)> {
    sim.pager()
        .frames()
        .iter()
        .map(|e| (e.occupant, e.protection))
        .collect()
}

/// Frame the page table currently maps `page` to
pub fn frame_of(sim: &Simulation, page: Page) -> Frame {
    let entry = sim.page_table().get_entry(page).unwrap();
    assert_ne!(entry.protection, Protection::None, "page {} not resident", page);
    entry.frame
}
