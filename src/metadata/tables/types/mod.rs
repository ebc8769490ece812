//! Shared building blocks of the metadata tables.
//!
//! - [`TableId`] names every table of the `#~` stream
//! - [`TableInfo`] holds row counts and derives every column width from them
//! - [`CodedIndex`] and [`CodedIndexType`] decode the tagged multi-table references
//! - [`MetadataTable`] is a typed, lazily-decoding view over one table's rows
//! - [`RowReadable`] and [`RowWritable`] are implemented by each raw row type

mod codedindex;
mod table;
mod tableid;
mod tableinfo;

pub use codedindex::*;
pub use table::*;
pub use tableid::*;
pub use tableinfo::*;
