//! InterfaceImpl table (`0x09`, ECMA-335 II.22.23).
//!
//! For a COM interface the single row names its base interface, e.g. `IUnknown`.

mod raw;

pub use raw::*;
