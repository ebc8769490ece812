use std::marker::PhantomData;

use crate::{
    metadata::tables::{TableId, TableInfoRef},
    Result,
};

/// A raw table row that can be decoded from the tables stream.
pub trait RowReadable: Sized + Send {
    /// The table this row type belongs to
    const TABLE_ID: TableId;

    /// Row size in bytes for the given index widths.
    fn row_size(sizes: &TableInfoRef) -> u32 {
        sizes.row_size(Self::TABLE_ID)
    }

    /// Decodes the row at `offset` and advances `offset` past it.
    ///
    /// # Errors
    /// Returns an error if the row is truncated or contains an invalid coded index.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self>;
}

/// A raw table row that can be encoded into the tables stream.
pub trait RowWritable: RowReadable {
    /// Encodes the row at `offset` and advances `offset` past it.
    ///
    /// # Errors
    /// Returns an error if the buffer is too small or an index does not fit its column.
    fn row_write(&self, data: &mut [u8], offset: &mut usize, sizes: &TableInfoRef) -> Result<()>;
}

/// Typed view over the rows of one table.
///
/// Rows are decoded on access; the table itself only borrows the stream bytes.
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    row_size: u32,
    sizes: TableInfoRef,
    _phantom: PhantomData<T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Creates a view over `row_count` rows starting at the beginning of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is too short for all rows.
    pub fn new(data: &'a [u8], row_count: u32, sizes: TableInfoRef) -> Result<Self> {
        let row_size = T::row_size(&sizes);
        let size = row_count as usize * row_size as usize;
        if size > data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(MetadataTable {
            data: &data[..size],
            row_count,
            row_size,
            sizes,
            _phantom: PhantomData,
        })
    }

    /// Size of the table in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Size of a single row in bytes.
    #[must_use]
    pub fn row_size(&self) -> u32 {
        self.row_size
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Decodes the row with 1-based id `rid`.
    ///
    /// Returns `None` if `rid` is 0, past the last row, or the row cannot be decoded.
    #[must_use]
    pub fn get(&self, rid: u32) -> Option<T> {
        if rid == 0 || rid > self.row_count {
            return None;
        }

        T::row_read(
            self.data,
            &mut ((rid as usize - 1) * self.row_size as usize),
            rid,
            &self.sizes,
        )
        .ok()
    }

    /// Iterates all rows in table order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (1..=self.row_count).filter_map(move |rid| self.get(rid))
    }
}
