use crate::{
    file::io::{read_le_at_dyn, write_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A custom attribute applied to a metadata row
#[derive(Clone, Debug, PartialEq)]
pub struct CustomAttributeRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// Row the attribute is applied to
    pub parent: CodedIndex,
    /// Constructor of the attribute type
    pub constructor: CodedIndex,
    /// Index into `#Blob` with the encoded arguments
    pub value: u32,
}

impl RowReadable for CustomAttributeRaw {
    const TABLE_ID: TableId = TableId::CustomAttribute;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(CustomAttributeRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasCustomAttribute)?,
            constructor: CodedIndex::read(data, offset, sizes, CodedIndexType::CustomAttributeType)?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for CustomAttributeRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        self.parent.write(data, offset, sizes, CodedIndexType::HasCustomAttribute)?;
        self.constructor.write(data, offset, sizes, CodedIndexType::CustomAttributeType)?;
        write_le_at_dyn(data, offset, self.value, sizes.is_large_blob())?;
        Ok(())
    }
}
