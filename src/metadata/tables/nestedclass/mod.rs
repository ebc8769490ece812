//! NestedClass table (`0x29`, ECMA-335 II.22.32).
//!
//! Anonymous unions and structs inside Windows structs are emitted as nested types
//! such as `_Anonymous_e__Union`.

mod raw;

pub use raw::*;
