use std::path::Path;

use log::debug;

use crate::buffer::{BufferPool, ReplacementPolicy};
use crate::common::{
    PageId, Result, Rid, StratumError, ATTR_NAME_BYTES, DEFAULT_POOL_CAPACITY, FIRST_DATA_PAGE,
    META_PAGE, PAGE_SIZE, SLOT_FREE, SLOT_OCCUPIED,
};
use crate::storage::PageFile;

use super::scan::Scan;
use super::{Attribute, DataType, Predicate, Record, Schema};

/// Fixed metadata prefix of page 0:
/// `[tuple_count][first_free_page][num_attr][key_size]`, 4 bytes each,
/// little-endian.
const META_FIXED_BYTES: usize = 16;
/// Per-attribute metadata: `[name: 15 NUL-padded][type id][type length]`.
const META_ATTR_BYTES: usize = ATTR_NAME_BYTES + 8;
/// Usable attribute name bytes (one byte stays NUL)
const ATTR_NAME_USABLE: usize = ATTR_NAME_BYTES - 1;

fn encode_meta(page: &mut [u8], schema: &Schema, tuple_count: u32, first_free_page: PageId) {
    page[0..4].copy_from_slice(&tuple_count.to_le_bytes());
    page[4..8].copy_from_slice(&first_free_page.as_u32().to_le_bytes());
    page[8..12].copy_from_slice(&(schema.attr_count() as u32).to_le_bytes());
    page[12..16].copy_from_slice(&(schema.key_attrs().len() as u32).to_le_bytes());

    for (i, attr) in schema.attributes().enumerate() {
        let base = META_FIXED_BYTES + i * META_ATTR_BYTES;

        let name_field = &mut page[base..base + ATTR_NAME_BYTES];
        name_field.fill(0);
        let name = attr.name().as_bytes();
        let n = name.len().min(ATTR_NAME_USABLE);
        name_field[..n].copy_from_slice(&name[..n]);

        let dt = attr.data_type();
        page[base + ATTR_NAME_BYTES..base + ATTR_NAME_BYTES + 4]
            .copy_from_slice(&dt.type_id().to_le_bytes());
        page[base + ATTR_NAME_BYTES + 4..base + ATTR_NAME_BYTES + 8]
            .copy_from_slice(&dt.type_len().to_le_bytes());
    }
}

fn read_u32(page: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(page[offset..offset + 4].try_into().unwrap())
}

/// Rebuilds the schema and the cached counters from page 0. Key attribute
/// indices are advisory and not persisted, so the schema comes back
/// without them.
fn decode_meta(page: &[u8]) -> Result<(Schema, u32, PageId)> {
    let tuple_count = read_u32(page, 0);
    let first_free_page = PageId::new(read_u32(page, 4));
    let num_attr = read_u32(page, 8) as usize;
    let _key_size = read_u32(page, 12);

    if num_attr == 0 {
        return Err(StratumError::CorruptTableHeader("no attributes"));
    }
    if META_FIXED_BYTES + num_attr * META_ATTR_BYTES > PAGE_SIZE {
        return Err(StratumError::CorruptTableHeader(
            "attribute list exceeds the page",
        ));
    }
    if first_free_page < FIRST_DATA_PAGE {
        return Err(StratumError::CorruptTableHeader(
            "first free page before page 1",
        ));
    }

    let mut attributes = Vec::with_capacity(num_attr);
    for i in 0..num_attr {
        let base = META_FIXED_BYTES + i * META_ATTR_BYTES;

        let name_field = &page[base..base + ATTR_NAME_BYTES];
        let end = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(ATTR_NAME_USABLE);
        let name = String::from_utf8_lossy(&name_field[..end]).into_owned();

        let type_id = read_u32(page, base + ATTR_NAME_BYTES);
        let type_len = read_u32(page, base + ATTR_NAME_BYTES + 4);
        let data_type = DataType::from_parts(type_id, type_len)
            .ok_or(StratumError::CorruptTableHeader("unknown attribute type"))?;

        attributes.push(Attribute::new(name, data_type));
    }

    let schema = Schema::new(attributes, Vec::new());
    if schema.record_size() > PAGE_SIZE {
        return Err(StratumError::CorruptTableHeader(
            "record wider than a page",
        ));
    }

    Ok((schema, tuple_count, first_free_page))
}

/// One open heap table backed by a single page file.
///
/// Page 0 of the file is the self-describing table header (schema plus the
/// tuple count and the first-free-page heuristic); pages from 1 on hold
/// fixed-width tombstoned slots. The table owns its buffer pool, so any
/// number of tables can be open at once.
pub struct Table {
    pool: BufferPool,
    schema: Schema,
    tuple_count: u32,
    /// Lower bound on the next page with a free slot (always ≥ 1)
    first_free_page: PageId,
}

impl Table {
    /// Creates the table's page file and writes its header page.
    /// The table is not open afterwards; use [`Table::open`].
    pub fn create<P: AsRef<Path>>(path: P, schema: &Schema) -> Result<()> {
        if schema.attr_count() == 0 {
            return Err(StratumError::EmptySchema);
        }
        let record_size = schema.record_size();
        if record_size > PAGE_SIZE {
            return Err(StratumError::RecordTooLarge {
                size: record_size,
                page_size: PAGE_SIZE,
            });
        }
        if META_FIXED_BYTES + schema.attr_count() * META_ATTR_BYTES > PAGE_SIZE {
            return Err(StratumError::SchemaTooLarge {
                attrs: schema.attr_count(),
            });
        }

        PageFile::create(&path)?;

        let mut file = PageFile::open(&path)?;
        let mut page = [0u8; PAGE_SIZE];
        encode_meta(&mut page, schema, 0, FIRST_DATA_PAGE);
        file.write_block(META_PAGE, &page)?;
        file.close()?;

        debug!("created table {}", path.as_ref().display());
        Ok(())
    }

    /// Opens the table: sets up its buffer pool and reconstructs the
    /// schema and counters from page 0.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let pool = BufferPool::new(&path, DEFAULT_POOL_CAPACITY, ReplacementPolicy::Lru)?;

        let (schema, tuple_count, first_free_page) = {
            let guard = pool.pin(META_PAGE)?;
            let data = guard.data();
            decode_meta(&data[..])?
        };
        // noop while the header frame is clean
        pool.flush_page(META_PAGE)?;

        debug!(
            "opened table {} ({} tuples, first free page {})",
            path.as_ref().display(),
            tuple_count,
            first_free_page.as_u32()
        );

        Ok(Self {
            pool,
            schema,
            tuple_count,
            first_free_page,
        })
    }

    /// Closes the table, flushing every dirty frame of its pool.
    pub fn close(self) -> Result<()> {
        self.pool.close()
    }

    /// Removes the table's page file.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        PageFile::destroy(path)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Cached number of live tuples (inserts minus deletes, never below 0).
    pub fn tuple_count(&self) -> u32 {
        self.tuple_count
    }

    pub fn first_free_page(&self) -> PageId {
        self.first_free_page
    }

    /// The table's buffer pool, mainly for inspecting I/O statistics.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Inserts a record into the first free slot at or after the
    /// first-free-page heuristic and assigns its [`Rid`].
    ///
    /// Probing walks pages left to right, slot by slot; reaching past the
    /// end of the file grows it with zeroed (all-free) pages through the
    /// pool, so probing always terminates. The tuple count and heuristic
    /// are persisted to page 0 before returning; a failure there is a hard
    /// error, though the slot itself is already written (not rolled back).
    pub fn insert(&mut self, record: &mut Record) -> Result<Rid> {
        let record_size = self.schema.record_size();
        let slots_per_page = self.schema.slots_per_page();
        assert_eq!(
            record.data().len(),
            record_size,
            "record does not match the table schema"
        );

        let mut page = self.first_free_page;
        let rid = loop {
            let guard = self.pool.pin(page)?;

            let free_slot = {
                let data = guard.data();
                (0..slots_per_page).find(|s| data[s * record_size] == SLOT_FREE)
            };

            if let Some(slot) = free_slot {
                let mut data = guard.data_mut();
                let base = slot * record_size;
                data[base] = SLOT_OCCUPIED;
                data[base + 1..base + record_size].copy_from_slice(&record.data()[1..]);
                break Rid::new(page, slot as u16);
            }

            drop(guard);
            page = page.next();
        };

        self.tuple_count += 1;
        self.first_free_page = rid.page;
        self.persist_meta()?;

        record.set_id(rid);
        debug!("inserted record at {}", rid);
        Ok(rid)
    }

    /// Frees the slot at `rid`. The slot may be reused by later inserts;
    /// the first-free-page heuristic is lowered to encourage that.
    pub fn delete(&mut self, rid: Rid) -> Result<()> {
        self.check_rid(rid)?;
        let record_size = self.schema.record_size();

        {
            let guard = self.pool.pin(rid.page)?;
            let mut data = guard.data_mut();
            data[rid.slot as usize * record_size] = SLOT_FREE;
        }

        self.tuple_count = self.tuple_count.saturating_sub(1);
        if rid.page < self.first_free_page {
            self.first_free_page = rid.page;
        }
        self.persist_meta()?;

        debug!("deleted record at {}", rid);
        Ok(())
    }

    /// Overwrites the slot at the record's [`Rid`] with its current bytes.
    /// The slot is marked occupied unconditionally; updating implies the
    /// record exists.
    pub fn update(&mut self, record: &Record) -> Result<()> {
        let rid = record.id().ok_or(StratumError::UnassignedRid)?;
        self.check_rid(rid)?;
        let record_size = self.schema.record_size();

        let guard = self.pool.pin(rid.page)?;
        let mut data = guard.data_mut();
        let base = rid.slot as usize * record_size;
        data[base] = SLOT_OCCUPIED;
        data[base + 1..base + record_size].copy_from_slice(&record.data()[1..]);

        Ok(())
    }

    /// Reads the record at `rid`; a freed slot yields `NoTupleWithRid`.
    pub fn get(&self, rid: Rid) -> Result<Record> {
        self.check_rid(rid)?;
        let record_size = self.schema.record_size();

        let guard = self.pool.pin(rid.page)?;
        let data = guard.data();
        let base = rid.slot as usize * record_size;
        if data[base] == SLOT_FREE {
            return Err(StratumError::NoTupleWithRid(rid));
        }

        Ok(Record::from_slot(rid, &data[base..base + record_size]))
    }

    /// Starts a predicate scan over the table's live records in page
    /// order. The scan yields every record for which `predicate` evaluates
    /// to `Bool(true)`.
    pub fn scan<'a>(&'a self, predicate: &'a dyn Predicate) -> Scan<'a> {
        Scan::new(self, predicate)
    }

    fn check_rid(&self, rid: Rid) -> Result<()> {
        if rid.page < FIRST_DATA_PAGE || rid.slot as usize >= self.schema.slots_per_page() {
            return Err(StratumError::InvalidRid(rid));
        }
        Ok(())
    }

    /// Persists the tuple count and first-free-page to page 0 by a
    /// read-modify-write of the pinned header frame; the schema bytes
    /// behind the counters are untouched.
    fn persist_meta(&self) -> Result<()> {
        let guard = self.pool.pin(META_PAGE)?;
        let mut data = guard.data_mut();
        data[0..4].copy_from_slice(&self.tuple_count.to_le_bytes());
        data[4..8].copy_from_slice(&self.first_free_page.as_u32().to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn test_schema() -> Schema {
        Schema::new(
            vec![
                Attribute::new("a", DataType::Int),
                Attribute::new("b", DataType::Text(5)),
                Attribute::new("c", DataType::Int),
            ],
            vec![0],
        )
    }

    #[test]
    fn test_meta_roundtrip() {
        let schema = test_schema();
        let mut page = [0u8; PAGE_SIZE];
        encode_meta(&mut page, &schema, 17, PageId::new(3));

        let (decoded, tuple_count, first_free_page) = decode_meta(&page).unwrap();
        assert_eq!(tuple_count, 17);
        assert_eq!(first_free_page, PageId::new(3));
        assert_eq!(decoded, schema);
    }

    #[test]
    fn test_meta_truncates_long_names() {
        let schema = Schema::new(
            vec![Attribute::new(
                "a_very_long_attribute_name",
                DataType::Int,
            )],
            vec![],
        );
        let mut page = [0u8; PAGE_SIZE];
        encode_meta(&mut page, &schema, 0, FIRST_DATA_PAGE);

        let (decoded, _, _) = decode_meta(&page).unwrap();
        assert_eq!(decoded.attribute(0).unwrap().name(), "a_very_long_at");
    }

    #[test]
    fn test_meta_rejects_garbage() {
        let page = [0u8; PAGE_SIZE];
        // num_attr == 0
        assert!(matches!(
            decode_meta(&page),
            Err(StratumError::CorruptTableHeader(_))
        ));

        let mut bad_type = [0u8; PAGE_SIZE];
        encode_meta(&mut bad_type, &test_schema(), 0, FIRST_DATA_PAGE);
        bad_type[META_FIXED_BYTES + ATTR_NAME_BYTES] = 0xEE;
        assert!(matches!(
            decode_meta(&bad_type),
            Err(StratumError::CorruptTableHeader(_))
        ));
    }

    #[test]
    fn test_create_rejects_oversized_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.tbl");

        let schema = Schema::new(
            vec![Attribute::new("blob", DataType::Text(PAGE_SIZE))],
            vec![],
        );
        assert!(matches!(
            Table::create(&path, &schema),
            Err(StratumError::RecordTooLarge { .. })
        ));
    }

    #[test]
    fn test_create_rejects_oversized_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.tbl");

        let attrs: Vec<Attribute> = (0..200)
            .map(|i| Attribute::new(format!("col{}", i), DataType::Bool))
            .collect();
        assert!(matches!(
            Table::create(&path, &Schema::new(attrs, vec![])),
            Err(StratumError::SchemaTooLarge { .. })
        ));
    }

    #[test]
    fn test_update_requires_rid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upd.tbl");
        let schema = test_schema();
        Table::create(&path, &schema).unwrap();
        let mut table = Table::open(&path).unwrap();

        let record = Record::new(table.schema());
        assert!(matches!(
            table.update(&record),
            Err(StratumError::UnassignedRid)
        ));
    }

    #[test]
    fn test_get_rejects_bad_rid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rid.tbl");
        let schema = test_schema();
        Table::create(&path, &schema).unwrap();
        let table = Table::open(&path).unwrap();

        // page 0 is metadata, never a data page
        assert!(matches!(
            table.get(Rid::new(META_PAGE, 0)),
            Err(StratumError::InvalidRid(_))
        ));
        let beyond = table.schema().slots_per_page() as u16;
        assert!(matches!(
            table.get(Rid::new(FIRST_DATA_PAGE, beyond)),
            Err(StratumError::InvalidRid(_))
        ));
    }

    #[test]
    fn test_insert_assigns_sequential_slots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seq.tbl");
        let schema = test_schema();
        Table::create(&path, &schema).unwrap();
        let mut table = Table::open(&path).unwrap();

        for slot in 0..3u16 {
            let mut record = Record::new(table.schema());
            record.set_attr(table.schema(), 0, &Value::Int(slot as i32)).unwrap();
            let rid = table.insert(&mut record).unwrap();
            assert_eq!(rid, Rid::new(FIRST_DATA_PAGE, slot));
            assert_eq!(record.id(), Some(rid));
        }
        assert_eq!(table.tuple_count(), 3);
    }
}
