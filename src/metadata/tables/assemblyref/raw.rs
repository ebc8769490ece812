use crate::{
    file::io::{read_le_at, read_le_at_dyn, write_le_at, write_le_at_dyn},
    metadata::{
        tables::{RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A reference to another assembly
#[derive(Clone, Debug, PartialEq)]
pub struct AssemblyRefRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Build number
    pub build_number: u16,
    /// Revision number
    pub revision_number: u16,
    /// `AssemblyFlags` bit mask
    pub flags: u32,
    /// Index into `#Blob`
    pub public_key_or_token: u32,
    /// Index into `#Strings`
    pub name: u32,
    /// Index into `#Strings`
    pub culture: u32,
    /// Index into `#Blob`
    pub hash_value: u32,
}

impl RowReadable for AssemblyRefRaw {
    const TABLE_ID: TableId = TableId::AssemblyRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(AssemblyRefRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            major_version: read_le_at::<u16>(data, offset)?,
            minor_version: read_le_at::<u16>(data, offset)?,
            build_number: read_le_at::<u16>(data, offset)?,
            revision_number: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            public_key_or_token: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            hash_value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

impl RowWritable for AssemblyRefRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at::<u16>(data, offset, self.major_version)?;
        write_le_at::<u16>(data, offset, self.minor_version)?;
        write_le_at::<u16>(data, offset, self.build_number)?;
        write_le_at::<u16>(data, offset, self.revision_number)?;
        write_le_at::<u32>(data, offset, self.flags)?;
        write_le_at_dyn(data, offset, self.public_key_or_token, sizes.is_large_blob())?;
        write_le_at_dyn(data, offset, self.name, sizes.is_large_str())?;
        write_le_at_dyn(data, offset, self.culture, sizes.is_large_str())?;
        write_le_at_dyn(data, offset, self.hash_value, sizes.is_large_blob())?;
        Ok(())
    }
}
