pub mod constants;
pub mod error;
pub mod fault;
pub mod frame_table;
pub mod io;
pub mod logging;
pub mod memory;
pub mod policy;
pub mod simulation;
pub mod translation;
pub mod workload;

// Re-export commonly used items for convenience
pub use constants::*;
pub use error::{VmError, VmResult};
pub use fault::{Pager, Stats};
pub use policy::PolicyKind;
pub use simulation::{Reference, SimConfig, Simulation};
pub use translation::{Access, Frame, Page, Protection};
pub use workload::Program;
