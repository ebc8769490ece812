//! FieldLayout table (`0x10`, ECMA-335 II.22.16).
//!
//! Present for every field of an explicit-layout type; unions use offset 0 throughout.

mod raw;

pub use raw::*;
