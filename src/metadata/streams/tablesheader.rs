use std::sync::Arc;
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::read_le,
    metadata::tables::{MetadataTable, RowReadable, TableId, TableInfo, TableInfoRef},
    Result,
};

/// Heap size flag announcing four bytes of extra data after the row counts
const EXTRA_DATA: u8 = 0x40;

/// The header of the `#~` stream and the location of every table inside it.
///
/// Tables are not decoded up front. [`TablesHeader::table`] hands out a typed
/// [`MetadataTable`] view that decodes rows on access.
///
/// ```rust,no_run
/// use winmdgen::metadata::{streams::TablesHeader, tables::TypeDefRaw};
///
/// # fn example(tables_header: &TablesHeader) -> winmdgen::Result<()> {
/// if let Some(typedefs) = tables_header.table::<TypeDefRaw>() {
///     for typedef in typedefs.iter().take(10) {
///         println!("{}: flags={:#x}", typedef.token, typedef.flags);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct TablesHeader<'a> {
    /// Major version of the table schema, 2 for all current producers
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Row counts and column widths
    pub info: TableInfoRef,
    data: &'a [u8],
    offsets: Vec<Option<usize>>,
}

/// Row count of one present table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSummary {
    /// The table
    pub table_id: TableId,
    /// Number of rows it holds
    pub row_count: u32,
}

impl<'a> TablesHeader<'a> {
    /// Parses the `#~` stream header and locates every present table.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream is too short for its declared
    /// tables and [`crate::Error::Malformed`] if no table is present.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < 24 {
            return Err(out_of_bounds_error!());
        }

        let valid = read_le::<u64>(&data[8..])?;
        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }

        let info = Arc::new(TableInfo::new(data, valid)?);

        let mut current_offset = 24 + valid.count_ones() as usize * 4;
        if read_le::<u8>(&data[6..])? & EXTRA_DATA != 0 {
            current_offset += 4;
        }

        let mut offsets = vec![None; TableId::COUNT];
        for table_id in TableId::iter() {
            if valid & (1 << table_id as usize) == 0 {
                continue;
            }

            let size = info.rows(table_id) as usize * info.row_size(table_id) as usize;
            let Some(end) = current_offset.checked_add(size) else {
                return Err(out_of_bounds_error!());
            };
            if end > data.len() {
                return Err(out_of_bounds_error!());
            }

            offsets[table_id as usize] = Some(current_offset);
            current_offset = end;
        }

        Ok(TablesHeader {
            major_version: read_le::<u8>(&data[4..])?,
            minor_version: read_le::<u8>(&data[5..])?,
            valid,
            sorted: read_le::<u64>(&data[16..])?,
            info,
            data,
            offsets,
        })
    }

    /// Number of present tables.
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// Returns a typed view over the table of row type `T`, or `None` if it is absent.
    #[must_use]
    pub fn table<T: RowReadable>(&self) -> Option<MetadataTable<'a, T>> {
        let offset = self.offsets[T::TABLE_ID as usize]?;
        MetadataTable::new(
            &self.data[offset..],
            self.info.rows(T::TABLE_ID),
            self.info.clone(),
        )
        .ok()
    }

    /// Returns `true` if the table is present.
    #[must_use]
    pub fn has_table(&self, table_id: TableId) -> bool {
        self.valid & (1 << table_id as usize) != 0
    }

    /// Number of rows in a table, 0 if absent.
    #[must_use]
    pub fn table_row_count(&self, table_id: TableId) -> u32 {
        self.info.rows(table_id)
    }

    /// Iterates the present tables in id order.
    pub fn present_tables(&self) -> impl Iterator<Item = TableId> + '_ {
        TableId::iter().filter(|table_id| self.has_table(*table_id))
    }

    /// Row counts of every present table.
    #[must_use]
    pub fn table_summary(&self) -> Vec<TableSummary> {
        self.present_tables()
            .map(|table_id| TableSummary {
                table_id,
                row_count: self.table_row_count(table_id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::{ModuleRefRaw, TypeDefRaw};

    #[rustfmt::skip]
    fn crafted() -> Vec<u8> {
        let mut data = vec![
            0x00, 0x00, 0x00, 0x00, // reserved
            0x02, 0x00,             // version 2.0
            0x00,                   // heap sizes
            0x01,                   // reserved
        ];
        // TypeDef (0x02) and ModuleRef (0x1A)
        let valid: u64 = (1 << 0x02) | (1 << 0x1A);
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        // TypeDef row: 4 + 2 + 2 + 2 + 2 + 2
        data.extend_from_slice(&[0x01, 0x00, 0x00, 0x00, 0x05, 0x00, 0x06, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00]);
        // ModuleRef rows: one string index each
        data.extend_from_slice(&[0x10, 0x00, 0x20, 0x00]);
        data
    }

    #[test]
    fn locate_tables() {
        let data = crafted();
        let header = TablesHeader::from(&data).unwrap();

        assert_eq!(header.major_version, 2);
        assert_eq!(header.table_count(), 2);
        assert!(header.has_table(TableId::TypeDef));
        assert!(!header.has_table(TableId::Field));
        assert_eq!(header.table_row_count(TableId::ModuleRef), 2);

        let typedefs = header.table::<TypeDefRaw>().unwrap();
        assert_eq!(typedefs.row_count(), 1);
        assert_eq!(typedefs.get(1).unwrap().type_name, 5);

        let modulerefs = header.table::<ModuleRefRaw>().unwrap();
        let names: Vec<u32> = modulerefs.iter().map(|row| row.name).collect();
        assert_eq!(names, vec![0x10, 0x20]);

        assert_eq!(
            header.table_summary(),
            vec![
                TableSummary { table_id: TableId::TypeDef, row_count: 1 },
                TableSummary { table_id: TableId::ModuleRef, row_count: 2 },
            ]
        );
    }

    #[test]
    fn truncated() {
        let mut data = crafted();
        data.pop();
        assert!(TablesHeader::from(&data).is_err());

        let mut empty = crafted();
        empty[8..16].copy_from_slice(&0u64.to_le_bytes());
        assert!(TablesHeader::from(&empty).is_err());
    }
}
