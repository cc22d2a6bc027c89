use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::Mutex;

use crate::common::{PageId, Result, StratumError, INVALID_PAGE, PAGE_SIZE};
use crate::storage::PageFile;

use super::{Frame, PageGuard, ReplacementPolicy};

/// Pool internals shared with the page guards.
pub(crate) struct PoolState {
    file: Mutex<PageFile>,
    /// Frames in insertion order; evicted frames are reused in place
    frames: Mutex<Vec<Arc<Frame>>>,
    clock_hand: Mutex<usize>,
    /// Monotonic pin counter driving the LRU policy
    tick: AtomicU64,
    reads: AtomicU32,
    writes: AtomicU32,
}

impl PoolState {
    /// Writes a frame's current contents back to its page and clears the
    /// dirty flag. Counts one disk write.
    pub(crate) fn write_back(&self, frame: &Frame) -> Result<()> {
        let page = frame.page_num();
        {
            let data = frame.data.read();
            let mut file = self.file.lock();
            file.write_block(page, &data[..])?;
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        frame.set_dirty(false);
        trace!("wrote back {}", page);
        Ok(())
    }

    /// Reads a page from disk, growing the file first so that pinning a
    /// page past the end of the file hands back a zeroed page.
    fn read_page(&self, page: PageId, buf: &mut [u8]) -> Result<()> {
        let mut file = self.file.lock();
        file.ensure_capacity(page.as_u32() + 1)?;
        file.read_block(page, buf)?;
        drop(file);
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A fixed-capacity frame cache over a single page file.
///
/// Pages are pinned into frames through [`pin`]; the returned [`PageGuard`]
/// releases the pin when dropped. Frames are allocated on demand up to the
/// capacity and kept in insertion order; once the pool is full, the
/// configured [`ReplacementPolicy`] picks an unpinned victim whose frame is
/// refilled in place. A pinned frame is never evicted.
///
/// The pool expects a file laid out by [`PageFile::create`]: whole pages
/// only, page 0 present.
///
/// [`pin`]: BufferPool::pin
pub struct BufferPool {
    path: PathBuf,
    capacity: usize,
    policy: ReplacementPolicy,
    state: Arc<PoolState>,
}

impl BufferPool {
    /// Opens a pool of `capacity` frames over the named page file.
    /// No frames are allocated until the first pin.
    pub fn new<P: AsRef<Path>>(
        path: P,
        capacity: usize,
        policy: ReplacementPolicy,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = PageFile::open(&path)?;

        debug!(
            "buffer pool over {} ({} frames, {:?})",
            path.display(),
            capacity,
            policy
        );

        Ok(Self {
            path,
            capacity,
            policy,
            state: Arc::new(PoolState {
                file: Mutex::new(file),
                frames: Mutex::new(Vec::new()),
                clock_hand: Mutex::new(0),
                tick: AtomicU64::new(0),
                reads: AtomicU32::new(0),
                writes: AtomicU32::new(0),
            }),
        })
    }

    /// Pins `page_num` into the pool and returns the guard holding the pin.
    ///
    /// A hit bumps the pin count on the resident frame. A miss reads the
    /// page from disk into a fresh frame while capacity lasts, then starts
    /// evicting by policy; if every frame is pinned the pin fails with
    /// `PinnedPagesInBuffer`. Pinning a page past the end of the file grows
    /// the file with zeroed pages first.
    pub fn pin(&self, page_num: PageId) -> Result<PageGuard> {
        let mut frames = self.state.frames.lock();
        let tick = self.state.tick.fetch_add(1, Ordering::Relaxed) + 1;

        // hit
        if let Some(frame) = frames.iter().find(|f| f.page_num() == page_num) {
            frame.pin();
            frame.touch(tick);
            return Ok(PageGuard::new(
                page_num,
                Arc::clone(frame),
                Arc::clone(&self.state),
            ));
        }

        // miss with a free slot
        if frames.len() < self.capacity {
            let mut buf = Box::new([0u8; PAGE_SIZE]);
            self.state.read_page(page_num, &mut buf[..])?;

            let frame = Arc::new(Frame::new(page_num, buf, tick));
            frames.push(Arc::clone(&frame));
            trace!("filled frame {} with {}", frames.len() - 1, page_num);

            return Ok(PageGuard::new(page_num, frame, Arc::clone(&self.state)));
        }

        // miss with a full pool
        let victim_idx = {
            let mut hand = self.state.clock_hand.lock();
            self.policy.pick_victim(&frames, &mut hand)
        }
        .ok_or(StratumError::PinnedPagesInBuffer {
            pinned: frames.len(),
        })?;

        let victim = Arc::clone(&frames[victim_idx]);
        debug!(
            "evicting {} from frame {} for {}",
            victim.page_num(),
            victim_idx,
            page_num
        );

        if victim.is_dirty() {
            self.state.write_back(&victim)?;
        }

        // invalidate before the refill so a failed read leaves no frame
        // claiming to hold either page
        victim.set_page_num(INVALID_PAGE);
        {
            let mut data = victim.data.write();
            data.fill(0);
            self.state.read_page(page_num, &mut data[..])?;
        }
        victim.reset_for(page_num, tick);

        Ok(PageGuard::new(page_num, victim, Arc::clone(&self.state)))
    }

    /// Writes back every dirty, unpinned frame and clears its dirty flag.
    /// Stops at the first I/O error.
    pub fn flush_all(&self) -> Result<()> {
        let frames = self.state.frames.lock();
        for frame in frames.iter() {
            if frame.is_dirty() && frame.pin_count() == 0 {
                self.state.write_back(frame)?;
            }
        }
        Ok(())
    }

    /// Writes one page back if it is resident and dirty; a clean or absent
    /// page is a no-op.
    pub fn flush_page(&self, page_num: PageId) -> Result<()> {
        let frames = self.state.frames.lock();
        if let Some(frame) = frames.iter().find(|f| f.page_num() == page_num) {
            if frame.is_dirty() {
                self.state.write_back(frame)?;
            }
        }
        Ok(())
    }

    /// Flushes the pool and verifies that no pins are outstanding.
    ///
    /// With pins still held the pool is left untouched and the call fails
    /// with `PinnedPagesInBuffer`; it can be retried once the guards are
    /// dropped. Frame memory is released when the pool itself is dropped.
    pub fn close(&self) -> Result<()> {
        self.flush_all()?;

        let frames = self.state.frames.lock();
        let pinned = frames.iter().filter(|f| f.pin_count() > 0).count();
        if pinned > 0 {
            return Err(StratumError::PinnedPagesInBuffer { pinned });
        }
        Ok(())
    }

    /// Page numbers per frame in insertion order, padded to the capacity.
    pub fn frame_contents(&self) -> Vec<Option<PageId>> {
        let frames = self.state.frames.lock();
        let mut contents: Vec<Option<PageId>> =
            frames.iter().map(|f| Some(f.page_num())).collect();
        contents.resize(self.capacity, None);
        contents
    }

    /// Dirty flags per frame in insertion order, padded to the capacity.
    pub fn dirty_flags(&self) -> Vec<bool> {
        let frames = self.state.frames.lock();
        let mut flags: Vec<bool> = frames.iter().map(|f| f.is_dirty()).collect();
        flags.resize(self.capacity, false);
        flags
    }

    /// Pin counts per frame in insertion order, padded to the capacity.
    pub fn pin_counts(&self) -> Vec<u32> {
        let frames = self.state.frames.lock();
        let mut counts: Vec<u32> = frames.iter().map(|f| f.pin_count()).collect();
        counts.resize(self.capacity, 0);
        counts
    }

    /// Number of pages read from disk since the pool was opened.
    pub fn read_count(&self) -> u32 {
        self.state.reads.load(Ordering::Relaxed)
    }

    /// Number of pages written to disk since the pool was opened.
    pub fn write_count(&self) -> u32 {
        self.state.writes.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> ReplacementPolicy {
        self.policy
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        if let Err(e) = self.flush_all() {
            debug!("flush on drop failed: {}", e);
        }
    }
}
