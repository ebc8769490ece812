use crate::{
    file::io::{read_le_at, read_le_at_dyn, write_le_at, write_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// P/Invoke information of an imported method
#[derive(Clone, Debug, PartialEq)]
pub struct ImplMapRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// `PInvokeAttributes` bit mask
    pub mapping_flags: u16,
    /// The imported method
    pub member_forwarded: CodedIndex,
    /// Index into `#Strings` with the entry point name
    pub import_name: u32,
    /// The native module exporting the entry point
    pub import_scope: u32,
}

impl RowReadable for ImplMapRaw {
    const TABLE_ID: TableId = TableId::ImplMap;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ImplMapRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            mapping_flags: read_le_at::<u16>(data, offset)?,
            member_forwarded: CodedIndex::read(data, offset, sizes, CodedIndexType::MemberForwarded)?,
            import_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            import_scope: read_le_at_dyn(data, offset, sizes.table_index_bytes(TableId::ModuleRef) == 4)?,
        })
    }
}

impl RowWritable for ImplMapRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at::<u16>(data, offset, self.mapping_flags)?;
        self.member_forwarded.write(data, offset, sizes, CodedIndexType::MemberForwarded)?;
        write_le_at_dyn(data, offset, self.import_name, sizes.is_large_str())?;
        write_le_at_dyn(data, offset, self.import_scope, sizes.table_index_bytes(TableId::ModuleRef) == 4)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::metadata::tables::TableInfo;

    #[test]
    fn crafted_short() {
        let data = vec![
            0x44, 0x01, // mapping_flags
            0x03, 0x00, // member_forwarded: MethodDef row 1
            0x10, 0x00, // import_name
            0x02, 0x00, // import_scope
        ];

        let sizes = Arc::new(TableInfo::from_counts(
            &[(TableId::MethodDef, 4), (TableId::ModuleRef, 2)],
            false,
            false,
            false,
        ));
        let mut offset = 0;
        let row = ImplMapRaw::row_read(&data, &mut offset, 1, &sizes).unwrap();

        assert_eq!(row.token.value(), 0x1C00_0001);
        assert_eq!(row.mapping_flags, 0x0144);
        assert_eq!(row.member_forwarded, CodedIndex::new(TableId::MethodDef, 1));
        assert_eq!(row.import_name, 0x10);
        assert_eq!(row.import_scope, 2);
        assert_eq!(offset, 8);
    }
}
