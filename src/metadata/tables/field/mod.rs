//! Field table (`0x04`, ECMA-335 II.22.15).
//!
//! Struct members, enum members (as literal statics) and the constants of the `Apis`
//! classes all live here.

mod raw;

pub use raw::*;

#[allow(non_snake_case)]
/// Flag constants of `Field.Flags`.
pub mod FieldAttributes {
    /// Mask for the accessibility bits
    pub const FIELD_ACCESS_MASK: u32 = 0x0007;
    /// Accessible by anyone
    pub const PUBLIC: u32 = 0x0006;
    /// Defined on the type, not on instances
    pub const STATIC: u32 = 0x0010;
    /// Value is a compile-time constant
    pub const LITERAL: u32 = 0x0040;
    /// Name is special, e.g. `value__` of an enum
    pub const SPECIAL_NAME: u32 = 0x0200;
    /// Name is special to the runtime
    pub const RTSPECIAL_NAME: u32 = 0x0400;
    /// Field has a row in the Constant table
    pub const HAS_DEFAULT: u32 = 0x8000;
}
