use crate::{
    file::io::{read_le_at, read_le_at_dyn, write_le_at, write_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, RowWritable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A type definition
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDefRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the row within the table
    pub offset: usize,
    /// `TypeAttributes` bit mask
    pub flags: u32,
    /// Index into `#Strings`
    pub type_name: u32,
    /// Index into `#Strings`
    pub type_namespace: u32,
    /// Base type, null for interfaces and `<Module>`
    pub extends: CodedIndex,
    /// First field owned by this type
    pub field_list: u32,
    /// First method owned by this type
    pub method_list: u32,
}

impl RowReadable for TypeDefRaw {
    const TABLE_ID: TableId = TableId::TypeDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(TypeDefRaw {
            rid,
            token: Self::TABLE_ID.token(rid),
            offset: *offset,
            flags: read_le_at::<u32>(data, offset)?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            extends: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
            field_list: read_le_at_dyn(data, offset, sizes.table_index_bytes(TableId::Field) == 4)?,
            method_list: read_le_at_dyn(data, offset, sizes.table_index_bytes(TableId::MethodDef) == 4)?,
        })
    }
}

impl RowWritable for TypeDefRaw {
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()> {
        write_le_at::<u32>(data, offset, self.flags)?;
        write_le_at_dyn(data, offset, self.type_name, sizes.is_large_str())?;
        write_le_at_dyn(data, offset, self.type_namespace, sizes.is_large_str())?;
        self.extends.write(data, offset, sizes, CodedIndexType::TypeDefOrRef)?;
        write_le_at_dyn(data, offset, self.field_list, sizes.table_index_bytes(TableId::Field) == 4)?;
        write_le_at_dyn(data, offset, self.method_list, sizes.table_index_bytes(TableId::MethodDef) == 4)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::metadata::tables::{MetadataTable, TableInfo};

    #[test]
    fn crafted_short() {
        let data = vec![
            0x09, 0x01, 0x00, 0x00, // flags
            0x02, 0x00, // type_name
            0x03, 0x00, // type_namespace
            0x05, 0x00, // extends: TypeRef row 1
            0x01, 0x00, // field_list
            0x02, 0x00, // method_list
        ];

        let sizes = Arc::new(TableInfo::from_counts(
            &[
                (TableId::TypeDef, 1),
                (TableId::TypeRef, 1),
                (TableId::Field, 1),
                (TableId::MethodDef, 2),
            ],
            false,
            false,
            false,
        ));
        let table = MetadataTable::<TypeDefRaw>::new(&data, 1, sizes).unwrap();
        let row = table.get(1).unwrap();

        assert_eq!(row.token.value(), 0x0200_0001);
        assert_eq!(row.flags, 0x0109);
        assert_eq!(row.type_name, 2);
        assert_eq!(row.type_namespace, 3);
        assert_eq!(row.extends, CodedIndex::new(TableId::TypeRef, 1));
        assert_eq!(row.field_list, 1);
        assert_eq!(row.method_list, 2);
        assert!(table.get(2).is_none());
    }

    #[test]
    fn write_matches_read() {
        let sizes = Arc::new(TableInfo::from_counts(
            &[(TableId::TypeDef, 3), (TableId::TypeRef, 1)],
            true,
            false,
            false,
        ));
        let row = TypeDefRaw {
            rid: 2,
            token: Token::new(0x0200_0002),
            offset: 0,
            flags: 0x0010_0108,
            type_name: 0x0001_0000,
            type_namespace: 0x20,
            extends: CodedIndex::new(TableId::TypeDef, 3),
            field_list: 4,
            method_list: 5,
        };

        let mut buffer = vec![0u8; TypeDefRaw::row_size(&sizes) as usize];
        let mut offset = 0;
        row.row_write(&mut buffer, &mut offset, &sizes).unwrap();
        assert_eq!(offset, buffer.len());

        let mut offset = 0;
        let read = TypeDefRaw::row_read(&buffer, &mut offset, 2, &sizes).unwrap();
        assert_eq!(read, row);
    }
}
