//! Param table (`0x08`, ECMA-335 II.22.33).
//!
//! A row with sequence 0 describes the return value and only exists when the return
//! value carries attributes.

mod raw;

pub use raw::*;

#[allow(non_snake_case)]
/// Flag constants of `Param.Flags`.
pub mod ParamAttributes {
    /// Caller passes data in
    pub const IN: u32 = 0x0001;
    /// Callee writes data out
    pub const OUT: u32 = 0x0002;
    /// May be null
    pub const OPTIONAL: u32 = 0x0010;
    /// Has a row in the Constant table
    pub const HAS_DEFAULT: u32 = 0x1000;
    /// Has a row in the FieldMarshal table
    pub const HAS_FIELD_MARSHAL: u32 = 0x2000;
}
