use std::fmt;

use crate::translation::{Frame, Page};

pub type VmResult<T> = Result<T, VmError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    UnknownPolicy(String),

    UnknownProgram(String),

    InvalidGeometry { npages: usize, nframes: usize },

    MissingTrace,

    InvalidTrace { line: usize, reason: String },

    PageOutOfRange { page: Page, npages: usize },

    FrameOutOfRange { frame: Frame, nframes: usize },

    AddressOutOfRange { addr: usize, limit: usize },

    /// A fault was delivered for a page that already allows writes.
    WritableFault { page: Page },

    Inconsistent { reason: String },

    Io { message: String },
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::UnknownPolicy(name) => {
                write!(f, "unknown eviction policy: {}", name)
            }

            VmError::UnknownProgram(name) => {
                write!(f, "unknown program: {}", name)
            }

            VmError::InvalidGeometry { npages, nframes } => {
                write!(
                    f,
                    "invalid geometry: {} pages, {} frames (both must be nonzero and fit in memory)",
                    npages, nframes
                )
            }

            VmError::MissingTrace => {
                write!(f, "the trace program needs a trace file (--trace <path>)")
            }

            VmError::InvalidTrace { line, reason } => {
                write!(f, "invalid trace at line {}: {}", line, reason)
            }

            VmError::PageOutOfRange { page, npages } => {
                write!(f, "page {} out of range (npages = {})", page, npages)
            }

            VmError::FrameOutOfRange { frame, nframes } => {
                write!(f, "frame {} out of range (nframes = {})", frame, nframes)
            }

            VmError::AddressOutOfRange { addr, limit } => {
                write!(f, "address {:#x} outside virtual memory of {} bytes", addr, limit)
            }

            VmError::WritableFault { page } => {
                write!(f, "page fault on page {} which is already read/write", page)
            }

            VmError::Inconsistent { reason } => {
                write!(f, "inconsistent memory state: {}", reason)
            }

            VmError::Io { message } => {
                write!(f, "disk IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for VmError {}

impl From<std::io::Error> for VmError {
    fn from(err: std::io::Error) -> Self {
        VmError::Io {
            message: err.to_string(),
        }
    }
}
