/// Bytes per virtual page and per physical frame.
pub const PAGE_SIZE: usize = 4096;

/// Seed used for the policy and workload RNGs when none is given.
pub const DEFAULT_SEED: u64 = 0x5EED;

pub const USAGE: &str = "use: virtmem <npages> <nframes> <rand|fifo|custom> <alpha|beta|gamma|delta|trace>";
