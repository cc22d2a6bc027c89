use std::path::PathBuf;

use thiserror::Error;

use super::types::{PageId, Rid};

/// Storage engine error types
#[derive(Error, Debug)]
pub enum StratumError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("page {page} does not exist (file has {total} pages)")]
    ReadNonExistingPage { page: PageId, total: u32 },

    #[error("write of page {page} failed")]
    WriteFailed { page: PageId },

    #[error("{pinned} page(s) still pinned in the buffer pool")]
    PinnedPagesInBuffer { pinned: usize },

    #[error("invalid record id {0}")]
    InvalidRid(Rid),

    #[error("no tuple with record id {0}")]
    NoTupleWithRid(Rid),

    #[error("record has no assigned record id")]
    UnassignedRid,

    #[error("attribute index {index} out of range (schema has {count} attributes)")]
    AttributeOutOfRange { index: usize, count: usize },

    #[error("type mismatch: {left} vs {right}")]
    TypeMismatch {
        left: &'static str,
        right: &'static str,
    },

    #[error("record of {size} bytes does not fit a {page_size}-byte page")]
    RecordTooLarge { size: usize, page_size: usize },

    #[error("schema has no attributes")]
    EmptySchema,

    #[error("schema with {attrs} attributes does not fit the metadata page")]
    SchemaTooLarge { attrs: usize },

    #[error("corrupt table header: {0}")]
    CorruptTableHeader(&'static str),
}

pub type Result<T> = std::result::Result<T, StratumError>;
