//! Custom attribute decoding (ECMA-335 II.23.3).
//!
//! Two layers:
//!
//! - [`CustomAttributeParser`] reads a blob positionally into a [`CustomAttributeValue`]:
//!   the `0x0001` prolog, fixed arguments in constructor parameter order, then named
//!   arguments with their embedded serialization tags.
//! - [`KnownAttribute`] maps the small closed set of attributes that carry native semantics
//!   (GUIDs, bitfields, native typedefs, size fields, platform and marshaling markers) onto a
//!   typed value. Everything else is ignored.
//!
//! # Examples
//!
//! ```rust
//! use winmdgen::metadata::{
//!     customattributes::{parse_custom_attribute_blob, KnownAttribute},
//!     signatures::{SignatureParameter, TypeSignature},
//! };
//!
//! // [StructSizeField("cbSize")]
//! let blob = [0x01, 0x00, 0x06, b'c', b'b', b'S', b'i', b'z', b'e', 0x00, 0x00];
//! let params = [SignatureParameter { base: TypeSignature::String, ..Default::default() }];
//! let value = parse_custom_attribute_blob(&blob, &params)?;
//!
//! assert_eq!(
//!     KnownAttribute::decode("StructSizeFieldAttribute", &value)?,
//!     Some(KnownAttribute::StructSizeField("cbSize".to_string()))
//! );
//! # Ok::<(), winmdgen::Error>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 23.3 - Custom Attributes

mod known;
mod parser;
mod types;

pub use known::KnownAttribute;
pub use parser::{parse_custom_attribute_blob, CustomAttributeParser};
pub use types::*;
