use crate::{
    file::io::{read_le_at, read_le_at_dyn, write_le_at, write_le_at_dyn},
    metadata::{
        tables::{RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// Explicit offset of a field
#[derive(Clone, Debug, PartialEq)]
pub struct FieldLayoutRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// Byte offset of the field
    pub field_offset: u32,
    /// The field this offset applies to
    pub field: u32,
}

impl RowReadable for FieldLayoutRaw {
    const TABLE_ID: TableId = TableId::FieldLayout;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(FieldLayoutRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            field_offset: read_le_at::<u32>(data, offset)?,
            field: read_le_at_dyn(data, offset, sizes.table_index_bytes(TableId::Field) == 4)?,
        })
    }
}

impl RowWritable for FieldLayoutRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at::<u32>(data, offset, self.field_offset)?;
        write_le_at_dyn(data, offset, self.field, sizes.table_index_bytes(TableId::Field) == 4)?;
        Ok(())
    }
}
