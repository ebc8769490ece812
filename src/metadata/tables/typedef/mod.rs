//! TypeDef table (`0x02`, ECMA-335 II.22.37).
//!
//! Each row defines a struct, enum, interface, delegate or static `Apis` class. A type
//! owns the contiguous range of fields and methods up to the next row's `field_list` and
//! `method_list`:
//!
//! ```text
//! // Type A owns fields [A.field_list .. B.field_list)
//! // Type A owns methods [A.method_list .. B.method_list)
//! ```

mod raw;

pub use raw::*;

#[allow(non_snake_case)]
/// Flag constants of `TypeDef.Flags`.
///
/// Only the groups consulted while classifying and laying out types are listed.
pub mod TypeAttributes {
    /// Mask for the visibility bits
    pub const VISIBILITY_MASK: u32 = 0x0000_0007;
    /// Top-level public type
    pub const PUBLIC: u32 = 0x0000_0001;
    /// Nested public type
    pub const NESTED_PUBLIC: u32 = 0x0000_0002;

    /// Mask for the layout bits
    pub const LAYOUT_MASK: u32 = 0x0000_0018;
    /// Runtime chooses the field layout
    pub const AUTO_LAYOUT: u32 = 0x0000_0000;
    /// Fields are laid out in declaration order
    pub const SEQUENTIAL_LAYOUT: u32 = 0x0000_0008;
    /// Field offsets come from the FieldLayout table
    pub const EXPLICIT_LAYOUT: u32 = 0x0000_0010;

    /// The type is an interface
    pub const INTERFACE: u32 = 0x0000_0020;
    /// The type cannot be instantiated
    pub const ABSTRACT: u32 = 0x0000_0080;
    /// The type cannot be derived from
    pub const SEALED: u32 = 0x0000_0100;
    /// The type is imported from a type library
    pub const IMPORT: u32 = 0x0000_1000;

    /// Mask for the string format bits
    pub const STRING_FORMAT_MASK: u32 = 0x0003_0000;
    /// Strings are marshalled as ANSI
    pub const ANSI_CLASS: u32 = 0x0000_0000;
    /// Strings are marshalled as UTF-16
    pub const UNICODE_CLASS: u32 = 0x0001_0000;
    /// String format is chosen by the platform
    pub const AUTO_CLASS: u32 = 0x0002_0000;
}
