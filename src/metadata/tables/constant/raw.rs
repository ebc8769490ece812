use crate::{
    file::io::{read_le_at, read_le_at_dyn, write_le_at, write_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A compile-time constant of a field, parameter or property
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// Element type of the value
    pub base: u8,
    /// Always 0
    pub padding: u8,
    /// Owner of the constant
    pub parent: CodedIndex,
    /// Index into `#Blob` with the encoded value
    pub value: u32,
}

impl RowReadable for ConstantRaw {
    const TABLE_ID: TableId = TableId::Constant;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ConstantRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            base: read_le_at::<u8>(data, offset)?,
            padding: read_le_at::<u8>(data, offset)?,
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasConstant)?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for ConstantRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at::<u8>(data, offset, self.base)?;
        write_le_at::<u8>(data, offset, self.padding)?;
        self.parent.write(data, offset, sizes, CodedIndexType::HasConstant)?;
        write_le_at_dyn(data, offset, self.value, sizes.is_large_blob())?;
        Ok(())
    }
}
