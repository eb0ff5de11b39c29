//! Synthetic programs that drive the simulation.
//!
//! Every program works on the whole virtual region through
//! [`Simulation::load`] and [`Simulation::store`] and returns a checksum of
//! the region (or, for `trace`, the number of references replayed).

use std::fmt;
use std::str::FromStr;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{VmError, VmResult};
use crate::simulation::{Reference, Simulation};

const ALPHA_ROUNDS: usize = 100;
const DELTA_ROUNDS: usize = 10_000;
const GAMMA_PASSES: usize = 10;
const RUN_LENGTH: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    Alpha,
    Beta,
    Gamma,
    Delta,
    Trace,
}

impl FromStr for Program {
    type Err = VmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alpha" => Ok(Program::Alpha),
            "beta" => Ok(Program::Beta),
            "gamma" => Ok(Program::Gamma),
            "delta" => Ok(Program::Delta),
            "trace" => Ok(Program::Trace),
            other => Err(VmError::UnknownProgram(other.to_string())),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Program::Alpha => "alpha",
            Program::Beta => "beta",
            Program::Gamma => "gamma",
            Program::Delta => "delta",
            Program::Trace => "trace",
        };
        f.write_str(name)
    }
}

impl Program {
    /// Run the program to completion. `trace` is required for
    /// [`Program::Trace`] and ignored otherwise.
    pub fn run(self, sim: &mut Simulation, seed: u64, trace: Option<&[Reference]>) -> VmResult<u64> {
        let mut rng = StdRng::seed_from_u64(seed);
        info!("running {} over {} bytes", self, sim.length());

        match self {
            Program::Alpha => alpha(sim, &mut rng),
            Program::Beta => beta(sim, &mut rng),
            Program::Gamma => gamma(sim, &mut rng),
            Program::Delta => delta(sim, &mut rng),
            Program::Trace => {
                let references = trace.ok_or(VmError::MissingTrace)?;
                sim.run_trace(references)?;
                Ok(references.len() as u64)
            }
        }
    }
}

fn checksum(sim: &mut Simulation) -> VmResult<u64> {
    let mut total = 0u64;
    for addr in 0..sim.length() {
        total += u64::from(sim.load(addr)?);
    }
    Ok(total)
}

/// Sequential zeroing, short random bursts, then a sequential sum
fn alpha(sim: &mut Simulation, rng: &mut StdRng) -> VmResult<u64> {
    let length = sim.length();
    for addr in 0..length {
        sim.store(addr, 0)?;
    }

    for _ in 0..ALPHA_ROUNDS {
        let start = rng.random_range(0..length);
        for i in 0..RUN_LENGTH {
            sim.store((start + i) % length, i as u8)?;
        }
    }

    checksum(sim)
}

/// Random fill followed by an in-place heap sort of the whole region
fn beta(sim: &mut Simulation, rng: &mut StdRng) -> VmResult<u64> {
    let length = sim.length();
    for addr in 0..length {
        sim.store(addr, rng.random())?;
    }

    for root in (0..length / 2).rev() {
        sift_down(sim, root, length)?;
    }
    for end in (1..length).rev() {
        swap(sim, 0, end)?;
        sift_down(sim, 0, end)?;
    }

    checksum(sim)
}

fn swap(sim: &mut Simulation, a: usize, b: usize) -> VmResult<()> {
    let (va, vb) = (sim.load(a)?, sim.load(b)?);
    sim.store(a, vb)?;
    sim.store(b, va)
}

fn sift_down(sim: &mut Simulation, mut root: usize, end: usize) -> VmResult<()> {
    loop {
        let mut child = 2 * root + 1;
        if child >= end {
            return Ok(());
        }
        if child + 1 < end && sim.load(child)? < sim.load(child + 1)? {
            child += 1;
        }
        if sim.load(root)? >= sim.load(child)? {
            return Ok(());
        }
        swap(sim, root, child)?;
        root = child;
    }
}

/// Repeated dot product of the two halves of the region
fn gamma(sim: &mut Simulation, rng: &mut StdRng) -> VmResult<u64> {
    let length = sim.length();
    let half = length / 2;
    for addr in 0..length {
        sim.store(addr, rng.random())?;
    }

    let mut total = 0u64;
    for _ in 0..GAMMA_PASSES {
        for i in 0..half {
            let a = u64::from(sim.load(i)?);
            let b = u64::from(sim.load(half + i)?);
            total = total.wrapping_add(a * b);
        }
    }
    Ok(total)
}

/// Many short bursts of random writes at random places
fn delta(sim: &mut Simulation, rng: &mut StdRng) -> VmResult<u64> {
    let length = sim.length();
    for _ in 0..DELTA_ROUNDS {
        let start = rng.random_range(0..length);
        for i in 0..RUN_LENGTH {
            sim.store((start + i) % length, rng.random())?;
        }
    }

    checksum(sim)
}
