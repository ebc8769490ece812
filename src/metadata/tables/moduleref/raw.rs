use crate::{
    file::io::{read_le_at_dyn, write_le_at_dyn},
    metadata::{
        tables::{RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A reference to a native module
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleRefRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// Index into `#Strings` with the module file name
    pub name: u32,
}

impl RowReadable for ModuleRefRaw {
    const TABLE_ID: TableId = TableId::ModuleRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ModuleRefRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

impl RowWritable for ModuleRefRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at_dyn(data, offset, self.name, sizes.is_large_str())?;
        Ok(())
    }
}
