use crate::{
    file::io::{read_le_at, read_le_at_dyn, write_le_at, write_le_at_dyn},
    metadata::{
        tables::{RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// Explicit packing and size of a type
#[derive(Clone, Debug, PartialEq)]
pub struct ClassLayoutRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// Field alignment, 0 for the platform default
    pub packing_size: u16,
    /// Declared size in bytes, 0 if unspecified
    pub class_size: u32,
    /// The type this layout applies to
    pub parent: u32,
}

impl RowReadable for ClassLayoutRaw {
    const TABLE_ID: TableId = TableId::ClassLayout;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ClassLayoutRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            packing_size: read_le_at::<u16>(data, offset)?,
            class_size: read_le_at::<u32>(data, offset)?,
            parent: read_le_at_dyn(data, offset, sizes.table_index_bytes(TableId::TypeDef) == 4)?,
        })
    }
}

impl RowWritable for ClassLayoutRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at::<u16>(data, offset, self.packing_size)?;
        write_le_at::<u32>(data, offset, self.class_size)?;
        write_le_at_dyn(data, offset, self.parent, sizes.table_index_bytes(TableId::TypeDef) == 4)?;
        Ok(())
    }
}
