//! Module table (`0x00`, ECMA-335 II.22.30).
//!
//! Holds exactly one row naming the metadata file, e.g. `Windows.Win32.winmd`, and its
//! module version id.

mod raw;

pub use raw::*;
