//! Metadata streams.
//!
//! The metadata root is followed by up to five streams. Windows metadata uses four of them:
//!
//! - **`#~`** - the compressed metadata tables, see [`TablesHeader`]
//! - **`#Strings`** - null-terminated UTF-8 identifiers, see [`Strings`]
//! - **`#Blob`** - length-prefixed signatures, attribute values and constants, see [`Blob`]
//! - **`#GUID`** - 16-byte GUIDs referenced by 1-based index, see [`Guid`]
//!
//! The `#US` user string heap only carries IL string literals and is never consulted.
//!
//! # Examples
//!
//! ```rust
//! use winmdgen::metadata::streams::{Blob, Strings};
//!
//! let strings = Strings::from(b"\0RECT\0")?;
//! assert_eq!(strings.get(1)?, "RECT");
//!
//! let blob = Blob::from(&[0x00, 0x02, 0x06, 0x08])?;
//! assert_eq!(blob.get(1)?, &[0x06, 0x08]);
//! # Ok::<(), winmdgen::Error>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24.2.2 - Stream Headers

/// The header of a stream, indicates location + size + name
mod streamheader;
pub use streamheader::StreamHeader;

/// The '#Strings' heap implementation
mod strings;
pub use strings::Strings;

/// The '#Blob' heap implementation
mod blob;
pub use blob::Blob;

/// The '#GUID' heap implementation
mod guid;
pub use guid::Guid;

/// The '#~' header implementation
mod tablesheader;
pub use tablesheader::{TableSummary, TablesHeader};
