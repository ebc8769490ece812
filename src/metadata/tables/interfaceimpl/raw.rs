use crate::{
    file::io::{read_le_at_dyn, write_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// An interface implemented by a type
#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceImplRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// The implementing type
    pub class: u32,
    /// The implemented interface
    pub interface: CodedIndex,
}

impl RowReadable for InterfaceImplRaw {
    const TABLE_ID: TableId = TableId::InterfaceImpl;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(InterfaceImplRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            class: read_le_at_dyn(data, offset, sizes.table_index_bytes(TableId::TypeDef) == 4)?,
            interface: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
        })
    }
}

impl RowWritable for InterfaceImplRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at_dyn(data, offset, self.class, sizes.table_index_bytes(TableId::TypeDef) == 4)?;
        self.interface.write(data, offset, sizes, CodedIndexType::TypeDefOrRef)?;
        Ok(())
    }
}
