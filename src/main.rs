//! virtmem - demand-paging simulator
//!
//! Usage: virtmem [OPTIONS] <npages> <nframes> <rand|fifo|custom> <alpha|beta|gamma|delta|trace>
//!
//! Arguments:
//!   npages   - Number of virtual pages
//!   nframes  - Number of physical frames
//!   policy   - Eviction policy used when no frame is free
//!   program  - Workload to run against virtual memory
//!
//! Options:
//!   --seed <N>       Seed for the random policy and the workloads
//!   --disk <PATH>    Keep the backing store in a file instead of memory
//!   --trace <PATH>   Reference trace replayed by the `trace` program
//!   -v, --verbose    More log output (repeat for more)

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use virtmem::io::read_trace;
use virtmem::logging;
use virtmem::memory::FileDisk;
use virtmem::{DEFAULT_SEED, PolicyKind, Program, SimConfig, Simulation, USAGE, VmError};

/// Command-line configuration
#[derive(Parser, Debug)]
#[command(name = "virtmem", version, about = "Demand-paging virtual memory simulator", after_help = USAGE)]
struct Cli {
    /// Number of virtual pages
    npages: usize,

    /// Number of physical frames
    nframes: usize,

    /// Eviction policy: rand, fifo or custom
    policy: PolicyKind,

    /// Program to run: alpha, beta, gamma, delta or trace
    program: Program,

    /// Seed for the random policy and the workloads
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Back virtual memory with this file instead of an in-memory disk
    #[arg(long)]
    disk: Option<PathBuf>,

    /// Trace file for the `trace` program
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Print detailed paging information (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    logging::init(logging::level_from_verbosity(cli.verbose));

    // Run the simulation and handle any errors
    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Main logic separated from main() for cleaner error handling
fn run(cli: &Cli) -> Result<()> {
    // Step 1: Validate the geometry before allocating anything
    let config = SimConfig::new(cli.npages, cli.nframes, cli.policy).with_seed(cli.seed);
    config.validate()?;

    // Step 2: Load the trace if the program needs one
    let trace = match (cli.program, &cli.trace) {
        (Program::Trace, Some(path)) => Some(
            read_trace(path, cli.npages)
                .with_context(|| format!("couldn't load trace {}", path.display()))?,
        ),
        (Program::Trace, None) => return Err(VmError::MissingTrace.into()),
        _ => None,
    };

    // Step 3: Set up the backing store, page table and frame table
    let mut sim = match &cli.disk {
        Some(path) => {
            let disk = FileDisk::create(path, cli.npages)?;
            Simulation::with_backing_store(&config, Box::new(disk))?
        }
        None => Simulation::new(&config)?,
    };

    // Step 4: Run the program
    let result = cli
        .program
        .run(&mut sim, cli.seed, trace.as_deref())
        .with_context(|| format!("{} program aborted", cli.program))?;

    let stats = sim.stats();
    info!(
        "{} faults, {} reads, {} writes, {} evictions",
        stats.faults, stats.disk_reads, stats.disk_writes, stats.evictions
    );

    // Step 5: Report
    println!("{} result is {}", cli.program, result);
    println!("{}", stats);

    Ok(())
}
