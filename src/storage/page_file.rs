use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::{PageId, Result, StratumError, PAGE_SIZE};

/// A block-addressable page file.
///
/// Pages are numbered from 0 and every transfer moves a whole page. The
/// handle keeps a cursor (the "current block") that the relative read and
/// write helpers operate on. Each successful write flushes the stream
/// before returning; no fsync is performed.
pub struct PageFile {
    path: PathBuf,
    file: File,
    total_pages: u32,
    cursor: PageId,
}

impl PageFile {
    /// Creates (or truncates) the named page file with exactly one zeroed page.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|_| StratumError::FileNotFound(path.to_path_buf()))?;

        let zeros = [0u8; PAGE_SIZE];
        file.write_all(&zeros)
            .map_err(|e| short_write(e, PageId::new(0)))?;
        file.flush()?;
        Ok(())
    }

    /// Opens an existing page file read/write.
    ///
    /// The page count is the file size rounded up to whole pages, with a
    /// minimum of one; the cursor starts at page 0.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StratumError::FileNotFound(path.to_path_buf()),
                _ => StratumError::Io(e),
            })?;

        let len = file.metadata()?.len();
        let total_pages = (len.div_ceil(PAGE_SIZE as u64) as u32).max(1);

        Ok(Self {
            path: path.to_path_buf(),
            file,
            total_pages,
            cursor: PageId::new(0),
        })
    }

    /// Flushes and closes the file.
    pub fn close(mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }

    /// Removes the named page file.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::remove_file(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StratumError::FileNotFound(path.to_path_buf()),
            _ => StratumError::Io(e),
        })
    }

    /// Reads page `page` into the provided buffer and moves the cursor there.
    pub fn read_block(&mut self, page: PageId, buf: &mut [u8]) -> Result<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "buffer must be PAGE_SIZE bytes");

        if page.as_u32() >= self.total_pages {
            return Err(StratumError::ReadNonExistingPage {
                page,
                total: self.total_pages,
            });
        }

        self.file
            .seek(SeekFrom::Start(page.as_u32() as u64 * PAGE_SIZE as u64))?;
        self.file.read_exact(buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => StratumError::ReadNonExistingPage {
                page,
                total: self.total_pages,
            },
            _ => StratumError::Io(e),
        })?;

        self.cursor = page;
        Ok(())
    }

    pub fn read_first_block(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_block(PageId::new(0), buf)
    }

    pub fn read_previous_block(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.cursor.as_u32() == 0 {
            return Err(StratumError::ReadNonExistingPage {
                page: self.cursor,
                total: self.total_pages,
            });
        }
        self.read_block(PageId::new(self.cursor.as_u32() - 1), buf)
    }

    pub fn read_current_block(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_block(self.cursor, buf)
    }

    pub fn read_next_block(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_block(self.cursor.next(), buf)
    }

    pub fn read_last_block(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_block(PageId::new(self.total_pages - 1), buf)
    }

    /// Writes page `page` from the provided buffer, flushes, and moves the
    /// cursor there. The page must already exist; use [`ensure_capacity`]
    /// or [`append_empty_block`] to grow the file first.
    ///
    /// [`ensure_capacity`]: PageFile::ensure_capacity
    /// [`append_empty_block`]: PageFile::append_empty_block
    pub fn write_block(&mut self, page: PageId, buf: &[u8]) -> Result<()> {
        assert_eq!(buf.len(), PAGE_SIZE, "buffer must be PAGE_SIZE bytes");

        if page.as_u32() >= self.total_pages {
            return Err(StratumError::ReadNonExistingPage {
                page,
                total: self.total_pages,
            });
        }

        self.file
            .seek(SeekFrom::Start(page.as_u32() as u64 * PAGE_SIZE as u64))?;
        self.file
            .write_all(buf)
            .map_err(|e| short_write(e, page))?;
        self.file.flush()?;

        self.cursor = page;
        Ok(())
    }

    /// Writes at the current cursor position.
    pub fn write_current_block(&mut self, buf: &[u8]) -> Result<()> {
        self.write_block(self.cursor, buf)
    }

    /// Appends one zeroed page at the end of the file and moves the cursor
    /// onto it.
    pub fn append_empty_block(&mut self) -> Result<()> {
        let page = PageId::new(self.total_pages);
        self.file.seek(SeekFrom::End(0))?;

        let zeros = [0u8; PAGE_SIZE];
        self.file
            .write_all(&zeros)
            .map_err(|e| short_write(e, page))?;
        self.file.flush()?;

        self.total_pages += 1;
        self.cursor = page;
        Ok(())
    }

    /// Grows the file one zeroed page at a time until it has at least
    /// `pages` pages. A failed append aborts mid-way and leaves the file
    /// enlarged by the appends that succeeded.
    pub fn ensure_capacity(&mut self, pages: u32) -> Result<()> {
        while self.total_pages < pages {
            self.append_empty_block()?;
        }
        Ok(())
    }

    /// The current block position.
    pub fn block_pos(&self) -> PageId {
        self.cursor
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PageFile {
    fn drop(&mut self) {
        let _ = self.file.sync_all();
    }
}

fn short_write(e: std::io::Error, page: PageId) -> StratumError {
    match e.kind() {
        ErrorKind::WriteZero => StratumError::WriteFailed { page },
        _ => StratumError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_writes_one_zeroed_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.pf");

        PageFile::create(&path).unwrap();
        let mut pf = PageFile::open(&path).unwrap();
        assert_eq!(pf.total_pages(), 1);

        let mut buf = [0xFFu8; PAGE_SIZE];
        pf.read_first_block(&mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pf");
        assert!(matches!(
            PageFile::open(&path),
            Err(StratumError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_read_write_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rw.pf");
        PageFile::create(&path).unwrap();
        let mut pf = PageFile::open(&path).unwrap();

        let mut data = [0u8; PAGE_SIZE];
        data[0] = 42;
        data[PAGE_SIZE - 1] = 128;
        pf.write_block(PageId::new(0), &data).unwrap();

        let mut read = [0u8; PAGE_SIZE];
        pf.read_block(PageId::new(0), &mut read).unwrap();
        assert_eq!(read[0], 42);
        assert_eq!(read[PAGE_SIZE - 1], 128);
    }

    #[test]
    fn test_read_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("range.pf");
        PageFile::create(&path).unwrap();
        let mut pf = PageFile::open(&path).unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        assert!(matches!(
            pf.read_block(PageId::new(1), &mut buf),
            Err(StratumError::ReadNonExistingPage { .. })
        ));
    }

    #[test]
    fn test_append_and_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("append.pf");
        PageFile::create(&path).unwrap();
        let mut pf = PageFile::open(&path).unwrap();

        pf.append_empty_block().unwrap();
        assert_eq!(pf.total_pages(), 2);
        assert_eq!(pf.block_pos(), PageId::new(1));

        let mut buf = [0u8; PAGE_SIZE];
        pf.read_previous_block(&mut buf).unwrap();
        assert_eq!(pf.block_pos(), PageId::new(0));
        pf.read_next_block(&mut buf).unwrap();
        assert_eq!(pf.block_pos(), PageId::new(1));
        pf.read_current_block(&mut buf).unwrap();
        pf.read_last_block(&mut buf).unwrap();
        assert_eq!(pf.block_pos(), PageId::new(1));
        assert!(matches!(
            pf.read_next_block(&mut buf),
            Err(StratumError::ReadNonExistingPage { .. })
        ));
    }

    #[test]
    fn test_ensure_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cap.pf");
        PageFile::create(&path).unwrap();
        let mut pf = PageFile::open(&path).unwrap();

        pf.ensure_capacity(5).unwrap();
        assert_eq!(pf.total_pages(), 5);
        assert_eq!(pf.block_pos(), PageId::new(4));

        // already satisfied
        pf.ensure_capacity(3).unwrap();
        assert_eq!(pf.total_pages(), 5);
    }

    #[test]
    fn test_write_current_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cur.pf");
        PageFile::create(&path).unwrap();
        let mut pf = PageFile::open(&path).unwrap();
        pf.ensure_capacity(2).unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        pf.read_block(PageId::new(1), &mut buf).unwrap();

        let mut data = [7u8; PAGE_SIZE];
        pf.write_current_block(&data).unwrap();
        pf.read_current_block(&mut data).unwrap();
        assert_eq!(data[100], 7);
        assert_eq!(pf.block_pos(), PageId::new(1));
    }

    #[test]
    fn test_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.pf");
        PageFile::create(&path).unwrap();

        PageFile::destroy(&path).unwrap();
        assert!(matches!(
            PageFile::open(&path),
            Err(StratumError::FileNotFound(_))
        ));
        assert!(matches!(
            PageFile::destroy(&path),
            Err(StratumError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_persistence_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.pf");
        PageFile::create(&path).unwrap();

        {
            let mut pf = PageFile::open(&path).unwrap();
            pf.ensure_capacity(3).unwrap();
            let mut data = [0u8; PAGE_SIZE];
            data[0] = 123;
            pf.write_block(PageId::new(2), &data).unwrap();
            pf.close().unwrap();
        }

        {
            let mut pf = PageFile::open(&path).unwrap();
            assert_eq!(pf.total_pages(), 3);
            let mut data = [0u8; PAGE_SIZE];
            pf.read_block(PageId::new(2), &mut data).unwrap();
            assert_eq!(data[0], 123);
        }
    }
}
