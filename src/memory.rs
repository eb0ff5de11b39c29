use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::constants::*;
use crate::error::{VmError, VmResult};
use crate::translation::{Frame, Page};

/// Physical memory: `nframes` frames of `PAGE_SIZE` bytes each
pub struct PhysicalMemory {
    data: Box<[u8]>,
}

impl PhysicalMemory {
    /// Create a physical memory of `nframes` zeroed frames
    pub fn new(nframes: usize) -> Self {
        PhysicalMemory {
            data: vec![0u8; nframes * PAGE_SIZE].into_boxed_slice(),
        }
    }

    /// Read a byte from physical memory
    #[inline]
    pub fn read(&self, address: usize) -> u8 {
        self.data[address]
    }

    /// Write a byte to physical memory
    #[inline]
    pub fn write(&mut self, address: usize, value: u8) {
        self.data[address] = value;
    }

    /// Calculate the starting address of a frame
    #[inline]
    pub fn frame_to_address(frame: Frame) -> usize {
        frame * PAGE_SIZE
    }

    /// The bytes of one frame
    pub fn frame(&self, frame: Frame) -> &[u8] {
        let start = Self::frame_to_address(frame);
        &self.data[start..start + PAGE_SIZE]
    }

    pub fn frame_mut(&mut self, frame: Frame) -> &mut [u8] {
        let start = Self::frame_to_address(frame);
        &mut self.data[start..start + PAGE_SIZE]
    }
}

/// Secondary storage holding one `PAGE_SIZE` block per virtual page.
///
/// Implementations move whole pages between a frame buffer and the block
/// keyed by the page number.
pub trait BackingStore {
    fn npages(&self) -> usize;

    /// Fill `buf` with the stored contents of `page`
    fn read(&mut self, page: Page, buf: &mut [u8]) -> VmResult<()>;

    /// Persist `buf` as the contents of `page`
    fn write(&mut self, page: Page, buf: &[u8]) -> VmResult<()>;
}

fn check_block(page: Page, npages: usize, len: usize) -> VmResult<()> {
    if page >= npages {
        return Err(VmError::PageOutOfRange { page, npages });
    }
    if len != PAGE_SIZE {
        return Err(VmError::Io {
            message: format!("block transfer of {} bytes, expected {}", len, PAGE_SIZE),
        });
    }
    Ok(())
}

/// In-memory paging disk, zero-initialised
pub struct Disk {
    blocks: Vec<[u8; PAGE_SIZE]>,
}

impl Disk {
    pub fn new(npages: usize) -> Self {
        Disk {
            blocks: vec![[0u8; PAGE_SIZE]; npages],
        }
    }

    /// Direct access to a disk block, for seeding page contents
    pub fn block_mut(&mut self, page: Page) -> &mut [u8; PAGE_SIZE] {
        &mut self.blocks[page]
    }
}

impl BackingStore for Disk {
    fn npages(&self) -> usize {
        self.blocks.len()
    }

    fn read(&mut self, page: Page, buf: &mut [u8]) -> VmResult<()> {
        check_block(page, self.blocks.len(), buf.len())?;
        buf.copy_from_slice(&self.blocks[page]);
        Ok(())
    }

    fn write(&mut self, page: Page, buf: &[u8]) -> VmResult<()> {
        check_block(page, self.blocks.len(), buf.len())?;
        self.blocks[page].copy_from_slice(buf);
        Ok(())
    }
}

/// Paging disk stored in a regular file, one block per page at offset
/// `page * PAGE_SIZE`
pub struct FileDisk {
    file: File,
    npages: usize,
}

impl FileDisk {
    /// Create (or truncate) the disk file and size it for `npages` blocks
    pub fn create<P: AsRef<Path>>(path: P, npages: usize) -> VmResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())
            .map_err(|e| VmError::Io {
                message: format!("couldn't create virtual disk {}: {}", path.as_ref().display(), e),
            })?;
        file.set_len((npages * PAGE_SIZE) as u64)?;
        Ok(FileDisk { file, npages })
    }

    fn seek_block(&mut self, page: Page) -> VmResult<()> {
        self.file.seek(SeekFrom::Start((page * PAGE_SIZE) as u64))?;
        Ok(())
    }
}

impl BackingStore for FileDisk {
    fn npages(&self) -> usize {
        self.npages
    }

    fn read(&mut self, page: Page, buf: &mut [u8]) -> VmResult<()> {
        check_block(page, self.npages, buf.len())?;
        self.seek_block(page)?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, page: Page, buf: &[u8]) -> VmResult<()> {
        check_block(page, self.npages, buf.len())?;
        self.seek_block(page)?;
        self.file.write_all(buf)?;
        Ok(())
    }
}
