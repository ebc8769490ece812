use crate::{
    file::io::{read_le_at_dyn, write_le_at_dyn},
    metadata::{
        tables::{RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// Nesting of a type inside another type
#[derive(Clone, Debug, PartialEq)]
pub struct NestedClassRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// The nested type
    pub nested_class: u32,
    /// The enclosing type
    pub enclosing_class: u32,
}

impl RowReadable for NestedClassRaw {
    const TABLE_ID: TableId = TableId::NestedClass;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(NestedClassRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            nested_class: read_le_at_dyn(data, offset, sizes.table_index_bytes(TableId::TypeDef) == 4)?,
            enclosing_class: read_le_at_dyn(data, offset, sizes.table_index_bytes(TableId::TypeDef) == 4)?,
        })
    }
}

impl RowWritable for NestedClassRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at_dyn(data, offset, self.nested_class, sizes.table_index_bytes(TableId::TypeDef) == 4)?;
        write_le_at_dyn(data, offset, self.enclosing_class, sizes.table_index_bytes(TableId::TypeDef) == 4)?;
        Ok(())
    }
}
