use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::common::{PageId, PAGE_SIZE};

/// One cached page in the buffer pool.
///
/// A frame carries the page buffer itself plus the bookkeeping every
/// replacement policy needs: the pin count, the dirty flag, the last-touch
/// tick (LRU), the reference count (LFU), and the reference bit (CLOCK).
pub struct Frame {
    /// The page held by this frame (INVALID_PAGE while the frame is being refilled)
    page_num: RwLock<PageId>,
    /// Number of callers currently holding a pin on this frame
    pin_count: AtomicU32,
    /// Whether the page has been modified since it was read from disk
    dirty: AtomicBool,
    /// Pool tick of the most recent pin
    last_touch: AtomicU64,
    /// Number of pins since the frame was (re)filled
    ref_count: AtomicU64,
    /// Second-chance bit for the CLOCK sweep
    ref_bit: AtomicBool,
    /// The page data (pub(crate) for guard access)
    pub(crate) data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl Frame {
    /// Creates a frame holding `page_num`, already pinned once.
    pub(crate) fn new(page_num: PageId, data: Box<[u8; PAGE_SIZE]>, tick: u64) -> Self {
        Self {
            page_num: RwLock::new(page_num),
            pin_count: AtomicU32::new(1),
            dirty: AtomicBool::new(false),
            last_touch: AtomicU64::new(tick),
            ref_count: AtomicU64::new(1),
            ref_bit: AtomicBool::new(true),
            data: RwLock::new(data),
        }
    }

    pub fn page_num(&self) -> PageId {
        *self.page_num.read()
    }

    pub(crate) fn set_page_num(&self, page_num: PageId) {
        *self.page_num.write() = page_num;
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Increments the pin count and returns the new value.
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements the pin count and returns the new value.
    /// Returns None if the pin count was already 0.
    pub(crate) fn unpin(&self) -> Option<u32> {
        loop {
            let current = self.pin_count.load(Ordering::Acquire);
            if current == 0 {
                return None;
            }
            if self
                .pin_count
                .compare_exchange(current, current - 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Some(current - 1);
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }

    /// Records a pin at the given pool tick.
    pub(crate) fn touch(&self, tick: u64) {
        self.last_touch.store(tick, Ordering::Release);
        self.ref_count.fetch_add(1, Ordering::Relaxed);
        self.ref_bit.store(true, Ordering::Release);
    }

    pub(crate) fn last_touch(&self) -> u64 {
        self.last_touch.load(Ordering::Acquire)
    }

    pub(crate) fn ref_count(&self) -> u64 {
        self.ref_count.load(Ordering::Relaxed)
    }

    pub(crate) fn ref_bit(&self) -> bool {
        self.ref_bit.load(Ordering::Acquire)
    }

    pub(crate) fn clear_ref_bit(&self) {
        self.ref_bit.store(false, Ordering::Release);
    }

    /// Rebinds an evicted frame to a new page, pinned once.
    pub(crate) fn reset_for(&self, page_num: PageId, tick: u64) {
        *self.page_num.write() = page_num;
        self.pin_count.store(1, Ordering::Release);
        self.dirty.store(false, Ordering::Release);
        self.last_touch.store(tick, Ordering::Release);
        self.ref_count.store(1, Ordering::Relaxed);
        self.ref_bit.store(true, Ordering::Release);
    }
}
