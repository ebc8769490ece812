//! One-shot lookup indices over the metadata tables.
//!
//! ECMA-335 stores ownership as "first row" columns and back-references as parent columns
//! on the child table. Every question the type decoder asks ("which fields does this type
//! own", "which attributes sit on this field", "what is the explicit offset of this field")
//! would otherwise be a table scan, so the answers are collected once when the image is
//! loaded.

use std::{collections::HashMap, ops::Range};

use crate::{
    metadata::{
        streams::{Strings, TablesHeader},
        tables::{
            ClassLayoutRaw, ConstantRaw, CustomAttributeRaw, FieldLayoutRaw, ImplMapRaw,
            InterfaceImplRaw, MethodDefRaw, NestedClassRaw, TableId, TypeDefRaw,
        },
        token::Token,
    },
    Result,
};

/// Lookup tables derived from the raw metadata tables
#[derive(Debug, Default)]
pub struct MetadataIndex {
    types_by_name: HashMap<(String, String), Vec<u32>>,
    nested: HashMap<u32, Vec<u32>>,
    enclosing: HashMap<u32, u32>,
    field_ranges: Vec<Range<u32>>,
    method_ranges: Vec<Range<u32>>,
    param_ranges: Vec<Range<u32>>,
    method_owner: HashMap<u32, u32>,
    attributes: HashMap<Token, Vec<u32>>,
    constants: HashMap<Token, u32>,
    class_layouts: HashMap<u32, u32>,
    field_offsets: HashMap<u32, u32>,
    impl_maps: HashMap<u32, u32>,
    interface_impls: HashMap<u32, Vec<u32>>,
}

/// Computes `[start, next_start)` ownership ranges, clamped to `row_count`.
fn ownership_ranges(starts: &[u32], row_count: u32) -> Vec<Range<u32>> {
    let end_of_table = row_count + 1;
    starts
        .iter()
        .enumerate()
        .map(|(index, start)| {
            let start = (*start).clamp(1, end_of_table);
            let end = starts
                .get(index + 1)
                .copied()
                .unwrap_or(end_of_table)
                .clamp(start, end_of_table);
            start..end
        })
        .collect()
}

impl MetadataIndex {
    /// Builds all indices.
    ///
    /// # Errors
    /// Returns an error if a type name cannot be read from the `#Strings` heap.
    pub fn build(tables: &TablesHeader<'_>, strings: &Strings<'_>) -> Result<MetadataIndex> {
        let mut index = MetadataIndex::default();

        if let Some(nested_classes) = tables.table::<NestedClassRaw>() {
            for row in nested_classes.iter() {
                index
                    .nested
                    .entry(row.enclosing_class)
                    .or_default()
                    .push(row.nested_class);
                index.enclosing.insert(row.nested_class, row.enclosing_class);
            }
        }

        if let Some(typedefs) = tables.table::<TypeDefRaw>() {
            let mut field_starts = Vec::with_capacity(typedefs.row_count() as usize);
            let mut method_starts = Vec::with_capacity(typedefs.row_count() as usize);

            for row in typedefs.iter() {
                field_starts.push(row.field_list);
                method_starts.push(row.method_list);

                if index.enclosing.contains_key(&row.rid) {
                    continue;
                }

                let key = (
                    strings.get(row.type_namespace as usize)?.to_string(),
                    strings.get(row.type_name as usize)?.to_string(),
                );
                index.types_by_name.entry(key).or_default().push(row.rid);
            }

            index.field_ranges =
                ownership_ranges(&field_starts, tables.table_row_count(TableId::Field));
            index.method_ranges =
                ownership_ranges(&method_starts, tables.table_row_count(TableId::MethodDef));

            for (type_index, methods) in index.method_ranges.iter().enumerate() {
                for method in methods.clone() {
                    index.method_owner.insert(method, type_index as u32 + 1);
                }
            }
        }

        if let Some(methods) = tables.table::<MethodDefRaw>() {
            let param_starts: Vec<u32> = methods.iter().map(|row| row.param_list).collect();
            index.param_ranges =
                ownership_ranges(&param_starts, tables.table_row_count(TableId::Param));
        }

        if let Some(attributes) = tables.table::<CustomAttributeRaw>() {
            for row in attributes.iter() {
                index
                    .attributes
                    .entry(row.parent.token)
                    .or_default()
                    .push(row.rid);
            }
        }

        if let Some(constants) = tables.table::<ConstantRaw>() {
            for row in constants.iter() {
                index.constants.insert(row.parent.token, row.rid);
            }
        }

        if let Some(layouts) = tables.table::<ClassLayoutRaw>() {
            for row in layouts.iter() {
                index.class_layouts.insert(row.parent, row.rid);
            }
        }

        if let Some(layouts) = tables.table::<FieldLayoutRaw>() {
            for row in layouts.iter() {
                index.field_offsets.insert(row.field, row.field_offset);
            }
        }

        if let Some(impl_maps) = tables.table::<ImplMapRaw>() {
            for row in impl_maps.iter() {
                if row.member_forwarded.tag == TableId::MethodDef {
                    index.impl_maps.insert(row.member_forwarded.row, row.rid);
                }
            }
        }

        if let Some(interface_impls) = tables.table::<InterfaceImplRaw>() {
            for row in interface_impls.iter() {
                index
                    .interface_impls
                    .entry(row.class)
                    .or_default()
                    .push(row.rid);
            }
        }

        Ok(index)
    }

    /// Top-level TypeDef rows named `namespace.name`, in table order.
    ///
    /// Windows metadata defines some types once per architecture, hence the list.
    #[must_use]
    pub fn types_named(&self, namespace: &str, name: &str) -> &[u32] {
        self.types_by_name
            .get(&(namespace.to_string(), name.to_string()))
            .map_or(&[], Vec::as_slice)
    }

    /// TypeDef rows nested directly inside `enclosing`.
    #[must_use]
    pub fn nested_types(&self, enclosing: u32) -> &[u32] {
        self.nested.get(&enclosing).map_or(&[], Vec::as_slice)
    }

    /// The TypeDef row `nested` is declared in, if it is a nested type.
    #[must_use]
    pub fn enclosing_type(&self, nested: u32) -> Option<u32> {
        self.enclosing.get(&nested).copied()
    }

    /// Field rows owned by a TypeDef row.
    #[must_use]
    pub fn field_range(&self, typedef: u32) -> Range<u32> {
        Self::range(&self.field_ranges, typedef)
    }

    /// MethodDef rows owned by a TypeDef row.
    #[must_use]
    pub fn method_range(&self, typedef: u32) -> Range<u32> {
        Self::range(&self.method_ranges, typedef)
    }

    /// Param rows owned by a MethodDef row.
    #[must_use]
    pub fn param_range(&self, method: u32) -> Range<u32> {
        Self::range(&self.param_ranges, method)
    }

    /// TypeDef row declaring a MethodDef row.
    #[must_use]
    pub fn method_owner(&self, method: u32) -> Option<u32> {
        self.method_owner.get(&method).copied()
    }

    /// CustomAttribute rows applied to `parent`.
    #[must_use]
    pub fn attributes(&self, parent: Token) -> &[u32] {
        self.attributes.get(&parent).map_or(&[], Vec::as_slice)
    }

    /// Constant row attached to `parent`.
    #[must_use]
    pub fn constant(&self, parent: Token) -> Option<u32> {
        self.constants.get(&parent).copied()
    }

    /// ClassLayout row of a TypeDef row.
    #[must_use]
    pub fn class_layout(&self, typedef: u32) -> Option<u32> {
        self.class_layouts.get(&typedef).copied()
    }

    /// Explicit offset of a Field row.
    #[must_use]
    pub fn field_offset(&self, field: u32) -> Option<u32> {
        self.field_offsets.get(&field).copied()
    }

    /// ImplMap row of a MethodDef row.
    #[must_use]
    pub fn impl_map(&self, method: u32) -> Option<u32> {
        self.impl_maps.get(&method).copied()
    }

    /// InterfaceImpl rows of a TypeDef row.
    #[must_use]
    pub fn interface_impls(&self, typedef: u32) -> &[u32] {
        self.interface_impls.get(&typedef).map_or(&[], Vec::as_slice)
    }

    fn range(ranges: &[Range<u32>], rid: u32) -> Range<u32> {
        rid.checked_sub(1)
            .and_then(|index| ranges.get(index as usize))
            .cloned()
            .unwrap_or(0..0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges() {
        assert_eq!(ownership_ranges(&[1, 3, 3, 5], 6), vec![1..3, 3..3, 3..5, 5..7]);
        // Start past the table and decreasing starts are clamped
        assert_eq!(ownership_ranges(&[2, 1, 9], 4), vec![2..2, 1..5, 5..5]);
        assert!(ownership_ranges(&[], 3).is_empty());
    }

    #[test]
    fn range_lookup() {
        let index = MetadataIndex {
            field_ranges: vec![1..3, 3..4],
            ..MetadataIndex::default()
        };
        assert_eq!(index.field_range(2), 3..4);
        assert_eq!(index.field_range(0), 0..0);
        assert_eq!(index.field_range(3), 0..0);
    }
}
