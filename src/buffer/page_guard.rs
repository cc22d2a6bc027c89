use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, Result, PAGE_SIZE};

use super::frame::Frame;
use super::pool::PoolState;

/// A scoped pin on one buffered page.
///
/// The guard is the only way to reach a frame's bytes: `data` takes a read
/// lock for the duration of the borrow, `data_mut` takes a write lock and
/// marks the frame dirty. Dropping the guard releases the pin, so a page
/// can never be evicted while a guard on it is alive, and page data can
/// never be touched after unpinning.
///
/// Several guards may pin the same page at once; they share the frame's
/// buffer and the pin count tracks the holders.
pub struct PageGuard {
    page_num: PageId,
    frame: Arc<Frame>,
    state: Arc<PoolState>,
}

impl PageGuard {
    pub(crate) fn new(page_num: PageId, frame: Arc<Frame>, state: Arc<PoolState>) -> Self {
        Self {
            page_num,
            frame,
            state,
        }
    }

    pub fn page_num(&self) -> PageId {
        self.page_num
    }

    /// Read access to the page bytes.
    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.frame.data.read()
    }

    /// Write access to the page bytes; the frame becomes dirty.
    pub fn data_mut(&self) -> RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.frame.set_dirty(true);
        self.frame.data.write()
    }

    /// Flags the frame as modified without touching the bytes.
    pub fn mark_dirty(&self) {
        self.frame.set_dirty(true);
    }

    pub fn is_dirty(&self) -> bool {
        self.frame.is_dirty()
    }

    pub fn pin_count(&self) -> u32 {
        self.frame.pin_count()
    }

    /// Synchronously writes the frame's current contents back to disk,
    /// regardless of how many pins are held, and clears the dirty flag.
    pub fn force(&self) -> Result<()> {
        self.state.write_back(&self.frame)
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.frame.unpin();
    }
}
