use crate::{
    file::io::{read_le_at, read_le_at_dyn, write_le_at, write_le_at_dyn},
    metadata::{
        tables::{RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A parameter definition; sequence 0 is the return value
#[derive(Clone, Debug, PartialEq)]
pub struct ParamRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// `ParamAttributes` bit mask
    pub flags: u16,
    /// Position of the parameter, 0 for the return value
    pub sequence: u16,
    /// Index into `#Strings`
    pub name: u32,
}

impl RowReadable for ParamRaw {
    const TABLE_ID: TableId = TableId::Param;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ParamRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            flags: read_le_at::<u16>(data, offset)?,
            sequence: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

impl RowWritable for ParamRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at::<u16>(data, offset, self.flags)?;
        write_le_at::<u16>(data, offset, self.sequence)?;
        write_le_at_dyn(data, offset, self.name, sizes.is_large_str())?;
        Ok(())
    }
}
