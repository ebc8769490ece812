use std::sync::Arc;
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::{read_le, read_le_at},
    metadata::tables::types::{CodedIndexType, TableId},
    Result,
};

/// Row count of a single table and the width of an index into it
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Number of bits needed to address every row
    pub bits: u8,
    /// `true` if indices into this table take 4 bytes
    pub is_large: bool,
}

impl TableRowInfo {
    /// Computes the index width for a table of `rows` rows.
    #[must_use]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// Row counts and index widths of every table, plus the heap index widths.
///
/// Every column size in the tables stream derives from this information, so it is computed
/// once when the stream header is parsed and shared through [`TableInfoRef`].
#[derive(Clone, Default, Debug)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

/// Shared [`TableInfo`]
pub type TableInfoRef = Arc<TableInfo>;

impl TableInfo {
    /// Reads row counts and heap size flags from a tables stream header.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row count array is truncated.
    pub fn new(data: &[u8], valid_bitvec: u64) -> Result<Self> {
        let mut rows = vec![TableRowInfo::default(); TableId::COUNT];
        let mut next_row_offset = 24;

        for table_id in TableId::iter() {
            if (valid_bitvec & (1 << table_id as usize)) == 0 {
                continue;
            }

            let row_count = read_le_at::<u32>(data, &mut next_row_offset)?;
            rows[table_id as usize] = TableRowInfo::new(row_count);
        }

        let heap_size_flags = read_le::<u8>(&data[6..])?;
        Ok(Self::with_rows(
            rows,
            heap_size_flags & 1 == 1,
            heap_size_flags & 2 == 2,
            heap_size_flags & 4 == 4,
        ))
    }

    /// Creates the table information from explicit row counts, as used by the image writer.
    #[must_use]
    pub fn from_counts(
        counts: &[(TableId, u32)],
        large_str: bool,
        large_guid: bool,
        large_blob: bool,
    ) -> Self {
        let mut rows = vec![TableRowInfo::default(); TableId::COUNT];
        for (table_id, count) in counts {
            rows[*table_id as usize] = TableRowInfo::new(*count);
        }

        Self::with_rows(rows, large_str, large_guid, large_blob)
    }

    fn with_rows(
        rows: Vec<TableRowInfo>,
        large_str: bool,
        large_guid: bool,
        large_blob: bool,
    ) -> Self {
        let mut table_info = TableInfo {
            rows,
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: large_str,
            is_large_index_guid: large_guid,
            is_large_index_blob: large_blob,
        };

        for coded_index in CodedIndexType::iter() {
            let max_bits = coded_index
                .tables()
                .iter()
                .map(|table| table_info.rows[*table as usize].bits)
                .max()
                .unwrap_or(1);
            table_info.coded_indexes[coded_index as usize] = max_bits + coded_index.tag_bits();
        }

        table_info
    }

    /// Splits a raw coded index into table and row.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the tag is outside the coded index's table set.
    pub fn decode_coded_index(
        &self,
        value: u32,
        coded_index_type: CodedIndexType,
    ) -> Result<(TableId, u32)> {
        let tables = coded_index_type.tables();
        let tag_bits = coded_index_type.tag_bits();
        let tag = value & ((1 << tag_bits) - 1);

        match tables.get(tag as usize) {
            Some(table) => Ok((*table, value >> tag_bits)),
            None => Err(out_of_bounds_error!()),
        }
    }

    /// Row count of `table`.
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.rows[table as usize].rows
    }

    /// `true` if indices into `table` take 4 bytes.
    #[must_use]
    pub fn is_large(&self, table: TableId) -> bool {
        self.rows[table as usize].is_large
    }

    /// `true` if `#Strings` indices take 4 bytes.
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// `true` if `#GUID` indices take 4 bytes.
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// `true` if `#Blob` indices take 4 bytes.
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width of a `#Strings` index.
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` index.
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index.
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Width of a simple index into `table_id`.
    #[must_use]
    pub fn table_index_bytes(&self, table_id: TableId) -> u8 {
        if self.rows[table_id as usize].bits > 16 {
            4
        } else {
            2
        }
    }

    /// Width of a coded index of kind `coded_index_type`.
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u8 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    /// Row size of `table` in bytes, following the column schema of ECMA-335 II.22.
    #[must_use]
    #[rustfmt::skip]
    pub fn row_size(&self, table: TableId) -> u32 {
        let s = self.str_bytes();
        let g = self.guid_bytes();
        let b = self.blob_bytes();
        let t = |id: TableId| self.table_index_bytes(id);
        let c = |ci: CodedIndexType| self.coded_index_bytes(ci);

        u32::from(match table {
            TableId::Module =>                 /* generation */ 2 + /* name */ s + /* mvid, encid, encbaseid */ g * 3,
            TableId::TypeRef =>                c(CodedIndexType::ResolutionScope) + s + s,
            TableId::TypeDef =>                4 + s + s + c(CodedIndexType::TypeDefOrRef) + t(TableId::Field) + t(TableId::MethodDef),
            TableId::FieldPtr =>               t(TableId::Field),
            TableId::Field =>                  2 + s + b,
            TableId::MethodPtr =>              t(TableId::MethodDef),
            TableId::MethodDef =>              /* rva */ 4 + /* impl_flags */ 2 + /* flags */ 2 + s + b + t(TableId::Param),
            TableId::ParamPtr =>               t(TableId::Param),
            TableId::Param =>                  2 + 2 + s,
            TableId::InterfaceImpl =>          t(TableId::TypeDef) + c(CodedIndexType::TypeDefOrRef),
            TableId::MemberRef =>              c(CodedIndexType::MemberRefParent) + s + b,
            TableId::Constant =>               /* type, padding */ 2 + c(CodedIndexType::HasConstant) + b,
            TableId::CustomAttribute =>        c(CodedIndexType::HasCustomAttribute) + c(CodedIndexType::CustomAttributeType) + b,
            TableId::FieldMarshal =>           c(CodedIndexType::HasFieldMarshal) + b,
            TableId::DeclSecurity =>           2 + c(CodedIndexType::HasDeclSecurity) + b,
            TableId::ClassLayout =>            /* packing */ 2 + /* size */ 4 + t(TableId::TypeDef),
            TableId::FieldLayout =>            /* offset */ 4 + t(TableId::Field),
            TableId::StandAloneSig =>          b,
            TableId::EventMap =>               t(TableId::TypeDef) + t(TableId::Event),
            TableId::EventPtr =>               t(TableId::Event),
            TableId::Event =>                  2 + s + c(CodedIndexType::TypeDefOrRef),
            TableId::PropertyMap =>            t(TableId::TypeDef) + t(TableId::Property),
            TableId::PropertyPtr =>            t(TableId::Property),
            TableId::Property =>               2 + s + b,
            TableId::MethodSemantics =>        2 + t(TableId::MethodDef) + c(CodedIndexType::HasSemantics),
            TableId::MethodImpl =>             t(TableId::TypeDef) + c(CodedIndexType::MethodDefOrRef) * 2,
            TableId::ModuleRef =>              s,
            TableId::TypeSpec =>               b,
            TableId::ImplMap =>                2 + c(CodedIndexType::MemberForwarded) + s + t(TableId::ModuleRef),
            TableId::FieldRVA =>               4 + t(TableId::Field),
            TableId::EncLog =>                 4 + 4,
            TableId::EncMap =>                 4,
            TableId::Assembly =>               4 + 2 * 4 + 4 + b + s + s,
            TableId::AssemblyProcessor =>      4,
            TableId::AssemblyOS =>             4 * 3,
            TableId::AssemblyRef =>            2 * 4 + 4 + b + s + s + b,
            TableId::AssemblyRefProcessor =>   4 + t(TableId::AssemblyRef),
            TableId::AssemblyRefOS =>          4 * 3 + t(TableId::AssemblyRef),
            TableId::File =>                   4 + s + b,
            TableId::ExportedType =>           4 + 4 + s + s + c(CodedIndexType::Implementation),
            TableId::ManifestResource =>       4 + 4 + s + c(CodedIndexType::Implementation),
            TableId::NestedClass =>            t(TableId::TypeDef) * 2,
            TableId::GenericParam =>           2 + 2 + c(CodedIndexType::TypeOrMethodDef) + s,
            TableId::MethodSpec =>             c(CodedIndexType::MethodDefOrRef) + b,
            TableId::GenericParamConstraint => t(TableId::GenericParam) + c(CodedIndexType::TypeDefOrRef),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_indices() {
        let info = TableInfo::from_counts(&[(TableId::TypeDef, 10), (TableId::Field, 20)], false, false, false);

        assert_eq!(info.rows(TableId::TypeDef), 10);
        assert_eq!(info.table_index_bytes(TableId::Field), 2);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 2);
        assert_eq!(info.row_size(TableId::TypeDef), 14);
        assert_eq!(info.row_size(TableId::Field), 6);
        assert_eq!(info.row_size(TableId::CustomAttribute), 6);
    }

    #[test]
    fn large_indices() {
        // 2^14 rows overflow a 2-byte TypeDefOrRef coded index (2 tag bits)
        let info = TableInfo::from_counts(&[(TableId::TypeRef, 0x4000)], true, false, true);

        assert_eq!(info.table_index_bytes(TableId::TypeRef), 2);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);
        assert_eq!(info.coded_index_bytes(CodedIndexType::MethodDefOrRef), 2);
        assert_eq!(info.row_size(TableId::Field), 2 + 4 + 4);
        assert_eq!(info.row_size(TableId::TypeSpec), 4);
    }

    #[test]
    fn decode() {
        let info = TableInfo::from_counts(&[], false, false, false);

        let (table, row) = info
            .decode_coded_index((5 << 2) | 1, CodedIndexType::TypeDefOrRef)
            .unwrap();
        assert_eq!(table, TableId::TypeRef);
        assert_eq!(row, 5);

        let (table, row) = info
            .decode_coded_index((9 << 3) | 3, CodedIndexType::CustomAttributeType)
            .unwrap();
        assert_eq!(table, TableId::MemberRef);
        assert_eq!(row, 9);

        assert!(info
            .decode_coded_index(3, CodedIndexType::TypeDefOrRef)
            .is_err());
    }
}
