use super::types::PageId;

/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Page 0 of every table file holds the table metadata
pub const META_PAGE: PageId = PageId(0);

/// First page that holds record data
pub const FIRST_DATA_PAGE: PageId = PageId(1);

/// Sentinel page number for a frame that holds no page
pub const INVALID_PAGE: PageId = PageId(u32::MAX);

/// Buffer pool capacity (number of frames) used when opening a table
pub const DEFAULT_POOL_CAPACITY: usize = 16;

/// On-disk bytes reserved per attribute name (14 usable + NUL)
pub const ATTR_NAME_BYTES: usize = 15;

/// Tombstone byte of a free slot
pub const SLOT_FREE: u8 = 0;

/// Tombstone byte of an occupied slot
pub const SLOT_OCCUPIED: u8 = 1;
