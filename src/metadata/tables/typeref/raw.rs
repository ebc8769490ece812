use crate::{
    file::io::{read_le_at_dyn, write_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A reference to a type defined in this or another scope
#[derive(Clone, Debug, PartialEq)]
pub struct TypeRefRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// Scope the type is defined in
    pub resolution_scope: CodedIndex,
    /// Index into `#Strings`
    pub type_name: u32,
    /// Index into `#Strings`
    pub type_namespace: u32,
}

impl RowReadable for TypeRefRaw {
    const TABLE_ID: TableId = TableId::TypeRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(TypeRefRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            resolution_scope: CodedIndex::read(data, offset, sizes, CodedIndexType::ResolutionScope)?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

impl RowWritable for TypeRefRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        self.resolution_scope.write(data, offset, sizes, CodedIndexType::ResolutionScope)?;
        write_le_at_dyn(data, offset, self.type_name, sizes.is_large_str())?;
        write_le_at_dyn(data, offset, self.type_namespace, sizes.is_large_str())?;
        Ok(())
    }
}
