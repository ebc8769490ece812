//! ModuleRef table (`0x1A`, ECMA-335 II.22.31).
//!
//! Names the native DLLs that P/Invoke entry points are imported from.

mod raw;

pub use raw::*;
