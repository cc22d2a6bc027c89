//! Stratum - a single-file relational storage engine
//!
//! Each table lives in exactly one on-disk page file. Page 0 holds a
//! self-describing header (the schema plus the table counters); every
//! following page is a heap of fixed-width, tombstoned record slots.
//! Records are addressed by (page, slot) ids and scans are driven by a
//! predicate evaluated against each live record.
//!
//! # Architecture
//!
//! The engine is three layers, leaves first:
//!
//! - **Storage** (`storage`): durable fixed-size block I/O
//!   - `PageFile`: create/open/destroy a page file, read and write whole
//!     pages, cursor-relative helpers, zero-page growth
//!
//! - **Buffer Pool** (`buffer`): memory management over one page file
//!   - `BufferPool`: pins pages into frames and evicts by policy
//!   - `ReplacementPolicy`: FIFO, LRU, CLOCK, and LFU victim selection
//!   - `PageGuard`: RAII pin; dropping the guard releases the page
//!
//! - **Record Manager** (`record`): tables, records, and scans
//!   - `Table`: schema-on-page-0 heap table with insert/delete/update/get
//!   - `Scan`: page-order cursor filtered by a `Predicate`
//!   - `Expr`: a small comparison expression tree over attributes
//!
//! # Example
//!
//! ```rust,no_run
//! use stratum::record::{Attribute, CmpOp, DataType, Expr, Record, Schema, Table, Value};
//!
//! # fn main() -> stratum::Result<()> {
//! let schema = Schema::new(
//!     vec![
//!         Attribute::new("id", DataType::Int),
//!         Attribute::new("name", DataType::Text(8)),
//!     ],
//!     vec![0],
//! );
//!
//! Table::create("people.tbl", &schema)?;
//! let mut table = Table::open("people.tbl")?;
//!
//! let mut record = Record::new(table.schema());
//! record.set_attr(table.schema(), 0, &Value::Int(1))?;
//! record.set_attr(table.schema(), 1, &Value::Text("ada".into()))?;
//! table.insert(&mut record)?;
//!
//! let pred = Expr::cmp(CmpOp::Gt, Expr::attr(0), Expr::constant(0));
//! let mut scan = table.scan(&pred);
//! while let Some(row) = scan.next_record()? {
//!     println!("{}", row.get_attr(table.schema(), 1)?);
//! }
//! drop(scan);
//!
//! table.close()?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod common;
pub mod record;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{PageId, Result, Rid, StratumError, PAGE_SIZE};
pub use record::{Attribute, DataType, Record, Schema, Table, Value};
