//! Eviction policies.
//!
//! A policy is only consulted when the frame table has no free frame. The
//! kind is chosen once from the command line; the engine then talks to it
//! through [`VictimSelector`].

use std::fmt;
use std::str::FromStr;

use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{VmError, VmResult};
use crate::frame_table::FrameTable;
use crate::translation::{Frame, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Random,
    Fifo,
    Custom,
}

impl FromStr for PolicyKind {
    type Err = VmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rand" | "random" => Ok(PolicyKind::Random),
            "fifo" => Ok(PolicyKind::Fifo),
            "custom" => Ok(PolicyKind::Custom),
            other => Err(VmError::UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyKind::Random => "rand",
            PolicyKind::Fifo => "fifo",
            PolicyKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

pub trait VictimSelector {
    /// Pick the occupied frame to reclaim for `faulting`
    fn select_victim(&mut self, frames: &FrameTable, faulting: Page) -> VmResult<Frame>;

    /// Called once a frame has been loaded with a fresh page
    fn frame_loaded(&mut self, _frame: Frame) -> VmResult<()> {
        Ok(())
    }

    /// Called once a frame has been emptied by an eviction
    fn frame_released(&mut self, _frame: Frame) {}
}

/// Uniform choice over all frames
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    pub fn new(seed: u64) -> Self {
        RandomSelector {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl VictimSelector for RandomSelector {
    fn select_victim(&mut self, frames: &FrameTable, _faulting: Page) -> VmResult<Frame> {
        if frames.nframes() == 0 {
            return Err(VmError::Inconsistent {
                reason: "no frames to evict".into(),
            });
        }
        Ok(self.rng.random_range(0..frames.nframes()))
    }
}

/// Bounded ring of frame numbers in load order.
///
/// Head and tail arithmetic stays inside `push`/`pop`.
#[derive(Debug, Clone)]
pub struct FifoQueue {
    slots: Vec<Frame>,
    head: usize,
    len: usize,
}

impl FifoQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        FifoQueue {
            slots: vec![0; capacity],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append at the tail; fails when the ring is full
    pub fn push(&mut self, frame: Frame) -> VmResult<()> {
        if self.len == self.capacity() {
            return Err(VmError::Inconsistent {
                reason: format!("fifo queue full ({} frames) while loading frame {}", self.len, frame),
            });
        }
        let tail = (self.head + self.len) % self.capacity();
        self.slots[tail] = frame;
        self.len += 1;
        Ok(())
    }

    /// Remove the oldest frame
    pub fn pop(&mut self) -> Option<Frame> {
        if self.len == 0 {
            return None;
        }
        let frame = self.slots[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Some(frame)
    }

    /// Drop `frame` wherever it sits, keeping the order of the rest.
    /// Returns whether it was queued.
    pub fn remove(&mut self, frame: Frame) -> bool {
        let kept: Vec<Frame> = self.iter().filter(|&f| f != frame).collect();
        if kept.len() == self.len {
            return false;
        }
        self.slots[..kept.len()].copy_from_slice(&kept);
        self.head = 0;
        self.len = kept.len();
        true
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = Frame> + '_ {
        (0..self.len).map(move |i| self.slots[(self.head + i) % self.capacity()])
    }
}

/// Evicts the frame that was loaded longest ago
pub struct FifoSelector {
    queue: FifoQueue,
}

impl FifoSelector {
    pub fn new(nframes: usize) -> Self {
        FifoSelector {
            queue: FifoQueue::with_capacity(nframes),
        }
    }

    pub fn queue(&self) -> &FifoQueue {
        &self.queue
    }
}

impl VictimSelector for FifoSelector {
    fn select_victim(&mut self, _frames: &FrameTable, _faulting: Page) -> VmResult<Frame> {
        self.queue.pop().ok_or_else(|| VmError::Inconsistent {
            reason: "fifo queue empty while every frame is occupied".into(),
        })
    }

    fn frame_loaded(&mut self, frame: Frame) -> VmResult<()> {
        self.queue.push(frame)
    }

    fn frame_released(&mut self, frame: Frame) {
        self.queue.remove(frame);
    }
}

/// Evicts the occupant whose page number is farthest from the faulting page.
///
/// Scans left to right keeping the first strict maximum; if no occupant is
/// farther than distance 0 the last frame is chosen.
pub struct DistanceSelector;

impl VictimSelector for DistanceSelector {
    fn select_victim(&mut self, frames: &FrameTable, faulting: Page) -> VmResult<Frame> {
        let mut victim = frames
            .nframes()
            .checked_sub(1)
            .ok_or_else(|| VmError::Inconsistent {
                reason: "no frames to evict".into(),
            })?;
        let mut max_distance = 0;

        for (frame, occupant) in frames.occupied() {
            let distance = faulting.abs_diff(occupant);
            if distance > max_distance {
                victim = frame;
                max_distance = distance;
            }
        }

        trace!("distance victim for page {}: frame {} (distance {})", faulting, victim, max_distance);
        Ok(victim)
    }
}

/// The active policy, fixed for the lifetime of a simulation
pub enum EvictionPolicy {
    Random(RandomSelector),
    Fifo(FifoSelector),
    Custom(DistanceSelector),
}

impl EvictionPolicy {
    pub fn new(kind: PolicyKind, nframes: usize, seed: u64) -> Self {
        match kind {
            PolicyKind::Random => EvictionPolicy::Random(RandomSelector::new(seed)),
            PolicyKind::Fifo => EvictionPolicy::Fifo(FifoSelector::new(nframes)),
            PolicyKind::Custom => EvictionPolicy::Custom(DistanceSelector),
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            EvictionPolicy::Random(_) => PolicyKind::Random,
            EvictionPolicy::Fifo(_) => PolicyKind::Fifo,
            EvictionPolicy::Custom(_) => PolicyKind::Custom,
        }
    }

    /// The FIFO ring, when this is the FIFO policy
    pub fn fifo_queue(&self) -> Option<&FifoQueue> {
        match self {
            EvictionPolicy::Fifo(fifo) => Some(fifo.queue()),
            _ => None,
        }
    }
}

impl VictimSelector for EvictionPolicy {
    fn select_victim(&mut self, frames: &FrameTable, faulting: Page) -> VmResult<Frame> {
        match self {
            EvictionPolicy::Random(p) => p.select_victim(frames, faulting),
            EvictionPolicy::Fifo(p) => p.select_victim(frames, faulting),
            EvictionPolicy::Custom(p) => p.select_victim(frames, faulting),
        }
    }

    fn frame_loaded(&mut self, frame: Frame) -> VmResult<()> {
        match self {
            EvictionPolicy::Random(p) => p.frame_loaded(frame),
            EvictionPolicy::Fifo(p) => p.frame_loaded(frame),
            EvictionPolicy::Custom(p) => p.frame_loaded(frame),
        }
    }

    fn frame_released(&mut self, frame: Frame) {
        match self {
            EvictionPolicy::Random(p) => p.frame_released(frame),
            EvictionPolicy::Fifo(p) => p.frame_released(frame),
            EvictionPolicy::Custom(p) => p.frame_released(frame),
        }
    }
}
