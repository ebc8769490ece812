//! Serialization of a [`MetadataBuilder`] into a metadata root.
//!
//! Layout (ECMA-335 II.24.2.1): the `BSJB` root header and its stream headers, followed by
//! the `#~`, `#Strings`, `#GUID` and `#Blob` streams, each 4-byte aligned. Tables that the
//! reader looks up by key are sorted here and flagged in the `sorted` bit vector.

use std::sync::Arc;

use crate::{
    builder::{MetadataBuilder, METADATA_VERSION},
    metadata::{
        root::CIL_HEADER_MAGIC,
        tables::{CodedIndex, CodedIndexType, RowWritable, TableId, TableInfo, TableInfoRef},
    },
    Error, Result,
};

/// Heaps of this size or larger need 4-byte indices
const LARGE_HEAP: usize = 0x1_0000;

fn align4(length: usize) -> usize {
    (length + 3) & !3
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| malformed_error!("Metadata exceeds 4GB"))
}

/// Value of `index` as a `kind` coded index, the key of sorted tables.
fn coded_key(index: &CodedIndex, kind: CodedIndexType) -> u32 {
    let tag = kind.tag_of(index.tag).unwrap_or_default();
    (index.row << kind.tag_bits()) | tag
}

/// Row bytes of one table.
struct TableData {
    id: TableId,
    rows: u32,
    sorted: bool,
    bytes: Vec<u8>,
}

fn write_table<T: RowWritable>(rows: &[T], sorted: bool, info: &TableInfoRef) -> Result<TableData> {
    let row_size = info.row_size(T::TABLE_ID) as usize;
    let mut bytes = vec![0u8; rows.len() * row_size];
    let mut offset = 0;
    for row in rows {
        row.row_write(&mut bytes, &mut offset, info)?;
    }

    Ok(TableData {
        id: T::TABLE_ID,
        rows: to_u32(rows.len())?,
        sorted,
        bytes,
    })
}

fn sorted_by<T: Clone, K: Ord>(rows: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut rows = rows.to_vec();
    rows.sort_by_key(key);
    rows
}

impl MetadataBuilder {
    /// Serializes the image into a bare metadata root.
    ///
    /// # Errors
    /// Returns the first error recorded while defining the image, or an error if a table
    /// or heap outgrows its encoding.
    #[allow(clippy::cast_possible_truncation)]
    pub fn build(&self) -> Result<Vec<u8>> {
        if let Some(message) = &self.deferred {
            return Err(Error::Error(message.clone()));
        }

        let tables = self.tables_stream()?;
        let streams: [(&str, &[u8]); 4] = [
            ("#~", &tables),
            ("#Strings", self.strings.data()),
            ("#GUID", self.guids.data()),
            ("#Blob", self.blobs.data()),
        ];

        let version_length = align4(METADATA_VERSION.len() + 1);
        let header_length = 16
            + version_length
            + 4
            + streams
                .iter()
                .map(|(name, _)| 8 + align4(name.len() + 1))
                .sum::<usize>();

        let mut root = Vec::with_capacity(
            header_length + streams.iter().map(|(_, data)| align4(data.len())).sum::<usize>(),
        );
        root.extend_from_slice(&CIL_HEADER_MAGIC.to_le_bytes());
        root.extend_from_slice(&1u16.to_le_bytes());
        root.extend_from_slice(&1u16.to_le_bytes());
        root.extend_from_slice(&0u32.to_le_bytes());
        root.extend_from_slice(&to_u32(version_length)?.to_le_bytes());
        root.extend_from_slice(METADATA_VERSION.as_bytes());
        root.resize(16 + version_length, 0);
        root.extend_from_slice(&0u16.to_le_bytes());
        root.extend_from_slice(&(streams.len() as u16).to_le_bytes());

        let mut stream_offset = header_length;
        for (name, data) in &streams {
            root.extend_from_slice(&to_u32(stream_offset)?.to_le_bytes());
            root.extend_from_slice(&to_u32(align4(data.len()))?.to_le_bytes());
            let name_start = root.len();
            root.extend_from_slice(name.as_bytes());
            root.resize(name_start + align4(name.len() + 1), 0);
            stream_offset += align4(data.len());
        }

        for (_, data) in &streams {
            let start = root.len();
            root.extend_from_slice(data);
            root.resize(start + align4(data.len()), 0);
        }

        Ok(root)
    }

    /// The `#~` stream: header, row counts and rows of every non-empty table.
    fn tables_stream(&self) -> Result<Vec<u8>> {
        let large_str = self.strings.data().len() >= LARGE_HEAP;
        let large_guid = self.guids.data().len() / 16 >= LARGE_HEAP;
        let large_blob = self.blobs.data().len() >= LARGE_HEAP;

        let counts = [
            (TableId::Module, self.modules.len()),
            (TableId::TypeRef, self.type_refs.len()),
            (TableId::TypeDef, self.type_defs.len()),
            (TableId::Field, self.fields.len()),
            (TableId::MethodDef, self.methods.len()),
            (TableId::Param, self.params.len()),
            (TableId::InterfaceImpl, self.interface_impls.len()),
            (TableId::MemberRef, self.member_refs.len()),
            (TableId::Constant, self.constants.len()),
            (TableId::CustomAttribute, self.custom_attributes.len()),
            (TableId::ClassLayout, self.class_layouts.len()),
            (TableId::FieldLayout, self.field_layouts.len()),
            (TableId::ModuleRef, self.module_refs.len()),
            (TableId::TypeSpec, self.type_specs.len()),
            (TableId::ImplMap, self.impl_maps.len()),
            (TableId::AssemblyRef, self.assembly_refs.len()),
            (TableId::NestedClass, self.nested_classes.len()),
        ]
        .into_iter()
        .map(|(id, rows)| Ok((id, to_u32(rows)?)))
        .collect::<Result<Vec<_>>>()?;

        let info: TableInfoRef = Arc::new(TableInfo::from_counts(
            &counts, large_str, large_guid, large_blob,
        ));

        let has_constant = CodedIndexType::HasConstant;
        let has_attribute = CodedIndexType::HasCustomAttribute;
        let forwarded = CodedIndexType::MemberForwarded;

        let tables = [
            write_table(&self.modules, false, &info)?,
            write_table(&self.type_refs, false, &info)?,
            write_table(&self.type_defs, false, &info)?,
            write_table(&self.fields, false, &info)?,
            write_table(&self.methods, false, &info)?,
            write_table(&self.params, false, &info)?,
            write_table(
                &sorted_by(&self.interface_impls, |row| row.class),
                true,
                &info,
            )?,
            write_table(&self.member_refs, false, &info)?,
            write_table(
                &sorted_by(&self.constants, |row| coded_key(&row.parent, has_constant)),
                true,
                &info,
            )?,
            write_table(
                &sorted_by(&self.custom_attributes, |row| {
                    coded_key(&row.parent, has_attribute)
                }),
                true,
                &info,
            )?,
            write_table(
                &sorted_by(&self.class_layouts, |row| row.parent),
                true,
                &info,
            )?,
            write_table(
                &sorted_by(&self.field_layouts, |row| row.field),
                true,
                &info,
            )?,
            write_table(&self.module_refs, false, &info)?,
            write_table(&self.type_specs, false, &info)?,
            write_table(
                &sorted_by(&self.impl_maps, |row| {
                    coded_key(&row.member_forwarded, forwarded)
                }),
                true,
                &info,
            )?,
            write_table(&self.assembly_refs, false, &info)?,
            write_table(
                &sorted_by(&self.nested_classes, |row| row.nested_class),
                true,
                &info,
            )?,
        ];

        let mut valid = 0u64;
        let mut sorted = 0u64;
        for table in tables.iter().filter(|table| table.rows > 0) {
            valid |= 1 << table.id as u8;
            if table.sorted {
                sorted |= 1 << table.id as u8;
            }
        }

        let mut heap_sizes = 0u8;
        if large_str {
            heap_sizes |= 0x01;
        }
        if large_guid {
            heap_sizes |= 0x02;
        }
        if large_blob {
            heap_sizes |= 0x04;
        }

        let mut stream = Vec::new();
        stream.extend_from_slice(&0u32.to_le_bytes());
        stream.push(2);
        stream.push(0);
        stream.push(heap_sizes);
        stream.push(1);
        stream.extend_from_slice(&valid.to_le_bytes());
        stream.extend_from_slice(&sorted.to_le_bytes());
        for table in tables.iter().filter(|table| table.rows > 0) {
            stream.extend_from_slice(&table.rows.to_le_bytes());
        }
        for table in &tables {
            stream.extend_from_slice(&table.bytes);
        }

        Ok(stream)
    }
}
