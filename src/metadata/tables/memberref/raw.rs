use crate::{
    file::io::{read_le_at_dyn, write_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A reference to a member, e.g. an attribute constructor
#[derive(Clone, Debug, PartialEq)]
pub struct MemberRefRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// Owner of the member
    pub class: CodedIndex,
    /// Index into `#Strings`
    pub name: u32,
    /// Index into `#Blob` with the member signature
    pub signature: u32,
}

impl RowReadable for MemberRefRaw {
    const TABLE_ID: TableId = TableId::MemberRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(MemberRefRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            class: CodedIndex::read(data, offset, sizes, CodedIndexType::MemberRefParent)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for MemberRefRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        self.class.write(data, offset, sizes, CodedIndexType::MemberRefParent)?;
        write_le_at_dyn(data, offset, self.name, sizes.is_large_str())?;
        write_le_at_dyn(data, offset, self.signature, sizes.is_large_blob())?;
        Ok(())
    }
}
