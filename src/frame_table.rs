use crate::error::{VmError, VmResult};
use crate::translation::{Frame, Page, Protection};

/// What a physical frame currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameTableEntry {
    pub occupant: Option<Page>,
    pub protection: Protection,
}

impl FrameTableEntry {
    #[inline]
    pub fn is_free(&self) -> bool {
        self.protection == Protection::None
    }

    /// Writable frames may differ from the backing store
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.protection.is_writable()
    }
}

/// Per-frame bookkeeping, one entry per physical frame
#[derive(Debug, Clone)]
pub struct FrameTable {
    entries: Vec<FrameTableEntry>,
}

impl FrameTable {
    pub fn new(nframes: usize) -> Self {
        FrameTable {
            entries: vec![FrameTableEntry::default(); nframes],
        }
    }

    #[inline]
    pub fn nframes(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, frame: Frame) -> VmResult<FrameTableEntry> {
        self.entries
            .get(frame)
            .copied()
            .ok_or(VmError::FrameOutOfRange {
                frame,
                nframes: self.entries.len(),
            })
    }

    /// First frame with no protection bits set
    pub fn find_free_frame(&self) -> Option<Frame> {
        self.entries.iter().position(FrameTableEntry::is_free)
    }

    /// Record `page` as the occupant of `frame`
    pub fn assign(&mut self, frame: Frame, page: Page, protection: Protection) -> VmResult<()> {
        let nframes = self.entries.len();
        let entry = self
            .entries
            .get_mut(frame)
            .ok_or(VmError::FrameOutOfRange { frame, nframes })?;
        *entry = FrameTableEntry {
            occupant: Some(page),
            protection,
        };
        Ok(())
    }

    /// Reset `frame` to free, returning what it held before
    pub fn release(&mut self, frame: Frame) -> VmResult<FrameTableEntry> {
        let nframes = self.entries.len();
        let entry = self
            .entries
            .get_mut(frame)
            .ok_or(VmError::FrameOutOfRange { frame, nframes })?;
        Ok(std::mem::take(entry))
    }

    /// `(frame, occupant page)` for every occupied frame, in frame order
    pub fn occupied(&self) -> impl Iterator<Item = (Frame, Page)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_free())
            .filter_map(|(frame, e)| e.occupant.map(|page| (frame, page)))
    }

    pub fn occupied_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_free()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameTableEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_is_free() {
        let ft = FrameTable::new(3);
        assert_eq!(ft.nframes(), 3);
        assert_eq!(ft.find_free_frame(), Some(0));
        assert_eq!(ft.occupied_count(), 0);
    }

    #[test]
    fn test_find_free_frame_scans_in_order() {
        let mut ft = FrameTable::new(3);
        ft.assign(0, 10, Protection::Read).unwrap();
        assert_eq!(ft.find_free_frame(), Some(1));

        ft.assign(1, 11, Protection::ReadWrite).unwrap();
        ft.assign(2, 12, Protection::Read).unwrap();
        assert_eq!(ft.find_free_frame(), None);

        // Releasing a middle frame makes it the first free one
        ft.release(1).unwrap();
        assert_eq!(ft.find_free_frame(), Some(1));
    }

    #[test]
    fn test_release_returns_previous_entry() {
        let mut ft = FrameTable::new(2);
        ft.assign(1, 7, Protection::ReadWrite).unwrap();

        let old = ft.release(1).unwrap();
        assert_eq!(old.occupant, Some(7));
        assert!(old.is_dirty());

        let now = ft.entry(1).unwrap();
        assert!(now.is_free());
        assert_eq!(now.occupant, None);
    }

    #[test]
    fn test_occupied_view() {
        let mut ft = FrameTable::new(4);
        ft.assign(3, 1, Protection::Read).unwrap();
        ft.assign(0, 2, Protection::ReadWrite).unwrap();

        let occupied: Vec<_> = ft.occupied().collect();
        assert_eq!(occupied, vec![(0, 2), (3, 1)]);
        assert_eq!(ft.occupied_count(), 2);
    }

    #[test]
    fn test_out_of_range_frames() {
        let mut ft = FrameTable::new(2);
        assert!(matches!(ft.entry(2), Err(VmError::FrameOutOfRange { .. })));
        assert!(matches!(
            ft.assign(5, 0, Protection::Read),
            Err(VmError::FrameOutOfRange { frame: 5, nframes: 2 })
        ));
        assert!(ft.release(2).is_err());
    }
}
