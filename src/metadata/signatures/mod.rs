//! Signature parsing (ECMA-335 II.23.2).
//!
//! Windows metadata only needs three signature kinds:
//!
//! - **Field signatures** - the type of every struct member and constant
//! - **Method signatures** - P/Invoke functions, COM methods and function-pointer delegates
//! - **TypeSpec signatures** - the occasional type referenced through a specification
//!
//! The parser yields a raw [`TypeSignature`] tree with unresolved tokens. Turning that tree
//! into a semantic [`crate::metadata::typesystem::TypeDescriptor`] is the job of the
//! [`crate::metadata::typesystem::TypeDecoder`].
//!
//! # Examples
//!
//! ```rust
//! use winmdgen::metadata::signatures::{parse_field_signature, TypeSignature};
//!
//! let field = parse_field_signature(&[0x06, 0x0F, 0x07])?; // ushort*
//! assert!(matches!(field.base, TypeSignature::Ptr(_)));
//! # Ok::<(), winmdgen::Error>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 23.2 - Blobs and Signatures

mod parser;
mod types;

pub use parser::*;
pub use types::*;

use crate::Result;

/// Parse a `MethodSignature` from a byte slice
///
/// # Errors
/// Returns an error if the signature data is malformed or parsing fails
pub fn parse_method_signature(data: &[u8]) -> Result<SignatureMethod> {
    let mut parser = SignatureParser::new(data);
    parser.parse_method_signature()
}

/// Parse a `FieldSignature` from a byte slice
///
/// # Errors
/// Returns an error if the blob does not start with the `FIELD` marker or the type is malformed
pub fn parse_field_signature(data: &[u8]) -> Result<SignatureField> {
    let mut parser = SignatureParser::new(data);
    parser.parse_field_signature()
}

/// Parse a `TypeSpecSignature` from a byte slice
///
/// # Errors
/// Returns an error if the type is malformed
pub fn parse_type_spec_signature(data: &[u8]) -> Result<SignatureTypeSpec> {
    let mut parser = SignatureParser::new(data);
    parser.parse_type_spec_signature()
}
