use crate::constants::*;
use crate::error::{VmError, VmResult};

/// Virtual page number, in `[0, npages)`.
pub type Page = usize;

/// Physical frame number, in `[0, nframes)`.
pub type Frame = usize;

/// Represents the decomposed components of a virtual address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub addr: usize,
    pub page: Page,
    pub offset: usize,
}

impl VirtualAddress {
    /// Split a raw byte address into page number and page offset
    pub fn from_raw(addr: usize) -> Self {
        VirtualAddress {
            addr,
            page: addr / PAGE_SIZE,
            offset: addr % PAGE_SIZE,
        }
    }

    /// First byte of `page`
    pub fn page_base(page: Page) -> Self {
        Self::from_raw(page * PAGE_SIZE)
    }
}

impl std::fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VA({:#x}) = (page={}, offset={})", self.addr, self.page, self.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Protection bits of a mapping. `None` means unmapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protection {
    #[default]
    None,
    Read,
    ReadWrite,
}

impl Protection {
    #[inline]
    pub fn is_readable(self) -> bool {
        !matches!(self, Protection::None)
    }

    #[inline]
    pub fn is_writable(self) -> bool {
        matches!(self, Protection::ReadWrite)
    }

    pub fn permits(self, access: Access) -> bool {
        match access {
            Access::Read => self.is_readable(),
            Access::Write => self.is_writable(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageTableEntry {
    pub frame: Frame,
    pub protection: Protection,
}

/// Result of an address translation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translation {
    /// Physical byte address inside the frame buffer
    Mapped(usize),
    /// The access is not permitted by the current mapping
    Fault(Page),
}

/// Single-level page table mapping every virtual page to a frame and a
/// protection.
#[derive(Debug, Clone)]
pub struct PageTable {
    entries: Vec<PageTableEntry>,
    nframes: usize,
}

impl PageTable {
    pub fn new(npages: usize, nframes: usize) -> Self {
        PageTable {
            entries: vec![PageTableEntry::default(); npages],
            nframes,
        }
    }

    #[inline]
    pub fn npages(&self) -> usize {
        self.entries.len()
    }

    /// Size of the virtual address space in bytes
    pub fn virtual_size(&self) -> usize {
        self.entries.len() * PAGE_SIZE
    }

    /// Current mapping of `page`; protection is `None` when unmapped
    pub fn get_entry(&self, page: Page) -> VmResult<PageTableEntry> {
        self.entries
            .get(page)
            .copied()
            .ok_or(VmError::PageOutOfRange {
                page,
                npages: self.entries.len(),
            })
    }

    /// Install or update a mapping. `Protection::None` clears it.
    pub fn set_entry(&mut self, page: Page, frame: Frame, protection: Protection) -> VmResult<()> {
        if frame >= self.nframes {
            return Err(VmError::FrameOutOfRange {
                frame,
                nframes: self.nframes,
            });
        }
        let npages = self.entries.len();
        let entry = self
            .entries
            .get_mut(page)
            .ok_or(VmError::PageOutOfRange { page, npages })?;
        *entry = PageTableEntry { frame, protection };
        Ok(())
    }

    /// Translate a virtual address for the given access
    pub fn translate(&self, va: &VirtualAddress, access: Access) -> VmResult<Translation> {
        if va.addr >= self.virtual_size() {
            return Err(VmError::AddressOutOfRange {
                addr: va.addr,
                limit: self.virtual_size(),
            });
        }

        let entry = self.entries[va.page];
        if !entry.protection.permits(access) {
            return Ok(Translation::Fault(va.page));
        }

        Ok(Translation::Mapped(entry.frame * PAGE_SIZE + va.offset))
    }

    /// `(page, entry)` for every page that currently has a mapping
    pub fn mapped(&self) -> impl Iterator<Item = (Page, PageTableEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.protection.is_readable())
            .map(|(page, e)| (page, *e))
    }
}
