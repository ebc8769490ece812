//! AssemblyRef table (`0x23`, ECMA-335 II.22.5).

mod raw;

pub use raw::*;
