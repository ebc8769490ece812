use crate::{
    file::io::{read_le_at, read_le_at_dyn, write_le_at, write_le_at_dyn},
    metadata::{
        tables::{RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A method definition
#[derive(Clone, Debug, PartialEq)]
pub struct MethodDefRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// RVA of the body, 0 for imports and abstract methods
    pub rva: u32,
    /// `MethodImplAttributes` bit mask
    pub impl_flags: u16,
    /// `MethodAttributes` bit mask
    pub flags: u16,
    /// Index into `#Strings`
    pub name: u32,
    /// Index into `#Blob` with the method signature
    pub signature: u32,
    /// First parameter owned by this method
    pub param_list: u32,
}

impl RowReadable for MethodDefRaw {
    const TABLE_ID: TableId = TableId::MethodDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(MethodDefRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            rva: read_le_at::<u32>(data, offset)?,
            impl_flags: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            param_list: read_le_at_dyn(data, offset, sizes.table_index_bytes(TableId::Param) == 4)?,
        })
    }
}

impl RowWritable for MethodDefRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at::<u32>(data, offset, self.rva)?;
        write_le_at::<u16>(data, offset, self.impl_flags)?;
        write_le_at::<u16>(data, offset, self.flags)?;
        write_le_at_dyn(data, offset, self.name, sizes.is_large_str())?;
        write_le_at_dyn(data, offset, self.signature, sizes.is_large_blob())?;
        write_le_at_dyn(data, offset, self.param_list, sizes.table_index_bytes(TableId::Param) == 4)?;
        Ok(())
    }
}
