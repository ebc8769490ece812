use crate::{
    file::io::{read_le_at, read_le_at_dyn, write_le_at, write_le_at_dyn},
    metadata::{
        tables::{RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A field definition
#[derive(Clone, Debug, PartialEq)]
pub struct FieldRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// `FieldAttributes` bit mask
    pub flags: u16,
    /// Index into `#Strings`
    pub name: u32,
    /// Index into `#Blob` with the field signature
    pub signature: u32,
}

impl RowReadable for FieldRaw {
    const TABLE_ID: TableId = TableId::Field;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(FieldRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for FieldRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at::<u16>(data, offset, self.flags)?;
        write_le_at_dyn(data, offset, self.name, sizes.is_large_str())?;
        write_le_at_dyn(data, offset, self.signature, sizes.is_large_blob())?;
        Ok(())
    }
}
