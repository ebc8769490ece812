use crate::{
    file::io::{read_le_at, read_le_at_dyn, write_le_at, write_le_at_dyn},
    metadata::{
        tables::{RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// The single row describing the current module
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// Reserved, always 0
    pub generation: u16,
    /// Index into `#Strings` with the module name
    pub name: u32,
    /// Index into `#GUID` with the module version id
    pub mvid: u32,
    /// Reserved
    pub encid: u32,
    /// Reserved
    pub encbaseid: u32,
}

impl RowReadable for ModuleRaw {
    const TABLE_ID: TableId = TableId::Module;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ModuleRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            generation: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            mvid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            encid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            encbaseid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
        })
    }
}

impl RowWritable for ModuleRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at::<u16>(data, offset, self.generation)?;
        write_le_at_dyn(data, offset, self.name, sizes.is_large_str())?;
        write_le_at_dyn(data, offset, self.mvid, sizes.is_large_guid())?;
        write_le_at_dyn(data, offset, self.encid, sizes.is_large_guid())?;
        write_le_at_dyn(data, offset, self.encbaseid, sizes.is_large_guid())?;
        Ok(())
    }
}
