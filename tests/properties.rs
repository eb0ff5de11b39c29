mod helpers;

use helpers::{frame_of, needs_eviction, random_trace, simulation, snapshot};
use virtmem::{Access, PolicyKind, Protection};

const TRACE_LEN: usize = 400;

#[test]
fn test_tables_stay_consistent_after_every_fault() {
    for policy in [PolicyKind::Random, PolicyKind::Fifo, PolicyKind::Custom] {
        for seed in 0..4 {
            let mut sim = simulation(12, 4, policy);
            for reference in random_trace(12, TRACE_LEN, seed) {
                sim.touch(reference).unwrap();
                sim.check_consistency().unwrap();
                assert!(sim.pager().frames().occupied_count() <= 4);
            }
        }
    }
}

#[test]
fn test_fifo_evicts_oldest_load() {
    let nframes = 3;
    let mut sim = simulation(8, nframes, PolicyKind::Fifo);
    // Time each frame was last (re)loaded
    let mut loaded_at = vec![0usize; nframes];

    for (time, reference) in random_trace(8, TRACE_LEN, 77).into_iter().enumerate() {
        let unmapped = sim.page_table().get_entry(reference.page).unwrap().protection == Protection::None;
        let evicting = needs_eviction(&sim, reference);
        let expected = (0..nframes).min_by_key(|&f| loaded_at[f]).unwrap();

        sim.touch(reference).unwrap();

        let frame = frame_of(&sim, reference.page);
        if evicting {
            assert_eq!(frame, expected, "wrong FIFO victim at step {}", time);
        }
        if unmapped {
            loaded_at[frame] = time + 1;
        }
    }
}

#[test]
fn test_custom_victim_has_maximum_distance() {
    let mut sim = simulation(32, 4, PolicyKind::Custom);
    let mut evictions = 0;

    for reference in random_trace(32, TRACE_LEN, 5) {
        if !needs_eviction(&sim, reference) {
            sim.touch(reference).unwrap();
            continue;
        }

        let before = snapshot(&sim);
        sim.touch(reference).unwrap();
        evictions += 1;

        let victim = frame_of(&sim, reference.page);
        let distance = |occupant: Option<usize>| reference.page.abs_diff(occupant.unwrap());
        let victim_distance = distance(before[victim].0);
        for (frame, (occupant, _)) in before.iter().enumerate() {
            assert!(
                victim_distance >= distance(*occupant),
                "frame {} is farther than victim {}",
                frame,
                victim
            );
            // Ties go to the first frame scanned
            if distance(*occupant) == victim_distance {
                assert!(victim <= frame);
            }
        }
    }
    assert!(evictions > 0);
}

#[test]
fn test_writeback_iff_evicted_frame_was_writable() {
    for policy in [PolicyKind::Random, PolicyKind::Fifo, PolicyKind::Custom] {
        let mut sim = simulation(10, 3, policy);
        for reference in random_trace(10, TRACE_LEN, 21) {
            let evicting = needs_eviction(&sim, reference);
            let before = snapshot(&sim);
            let writes_before = sim.stats().disk_writes;

            sim.touch(reference).unwrap();
            let written = sim.stats().disk_writes - writes_before;

            if evicting {
                let victim = frame_of(&sim, reference.page);
                let was_dirty = before[victim].1 == Protection::ReadWrite;
                assert_eq!(written, u64::from(was_dirty), "{:?}", policy);
            } else {
                assert_eq!(written, 0, "{:?}", policy);
            }
        }
    }
}

#[test]
fn test_upgrade_keeps_frame_and_does_no_io() {
    let mut sim = simulation(6, 2, PolicyKind::Fifo);
    for reference in random_trace(6, TRACE_LEN, 3) {
        let entry = sim.page_table().get_entry(reference.page).unwrap();
        let upgrading = entry.protection == Protection::Read && reference.access == Access::Write;
        let stats = sim.stats();

        sim.touch(reference).unwrap();

        if upgrading {
            let after = sim.page_table().get_entry(reference.page).unwrap();
            assert_eq!(after.frame, entry.frame);
            assert_eq!(after.protection, Protection::ReadWrite);
            assert_eq!(sim.stats().faults, stats.faults + 1);
            assert_eq!(sim.stats().disk_reads, stats.disk_reads);
            assert_eq!(sim.stats().disk_writes, stats.disk_writes);
        }
    }
}
