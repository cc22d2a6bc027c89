use crate::common::{Result, Rid, StratumError, SLOT_OCCUPIED};

use super::{Schema, Value};

/// One record image: the tombstone byte followed by the attribute bytes,
/// exactly as stored in a page slot.
///
/// A record owns its buffer. It gets a [`Rid`] once it has been inserted
/// into (or read from) a table.
#[derive(Debug, Clone)]
pub struct Record {
    id: Option<Rid>,
    data: Vec<u8>,
}

impl Record {
    /// A zero-filled record sized for `schema`, not yet stored anywhere.
    pub fn new(schema: &Schema) -> Self {
        Self {
            id: None,
            data: vec![0; schema.record_size()],
        }
    }

    /// Wraps the bytes of an occupied slot.
    pub(crate) fn from_slot(rid: Rid, slot: &[u8]) -> Self {
        Self {
            id: Some(rid),
            data: slot.to_vec(),
        }
    }

    pub fn id(&self) -> Option<Rid> {
        self.id
    }

    pub(crate) fn set_id(&mut self, rid: Rid) {
        self.id = Some(rid);
    }

    /// The raw slot image, tombstone byte included.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_occupied(&self) -> bool {
        self.data[0] == SLOT_OCCUPIED
    }

    /// Decodes attribute `index` into an owned [`Value`].
    pub fn get_attr(&self, schema: &Schema, index: usize) -> Result<Value> {
        let attr = schema
            .attribute(index)
            .ok_or(StratumError::AttributeOutOfRange {
                index,
                count: schema.attr_count(),
            })?;
        let offset = schema.attr_offset(index).unwrap();
        let width = attr.data_type().width();

        Ok(Value::read_from(
            &self.data[offset..offset + width],
            attr.data_type(),
        ))
    }

    /// Writes `value` into attribute `index`. The value's type must match
    /// the attribute's declared type.
    pub fn set_attr(&mut self, schema: &Schema, index: usize, value: &Value) -> Result<()> {
        let attr = schema
            .attribute(index)
            .ok_or(StratumError::AttributeOutOfRange {
                index,
                count: schema.attr_count(),
            })?;
        if !value.matches(attr.data_type()) {
            return Err(StratumError::TypeMismatch {
                left: value.type_name(),
                right: attr.data_type().name(),
            });
        }

        let offset = schema.attr_offset(index).unwrap();
        let width = attr.data_type().width();
        value.write_to(&mut self.data[offset..offset + width], attr.data_type());
        Ok(())
    }
}
