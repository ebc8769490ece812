//! TypeRef table (`0x01`, ECMA-335 II.22.38).
//!
//! Windows metadata refers to every attribute type and every base class from
//! `System.Runtime` or `Windows.Win32.Foundation.Metadata` through this table.

mod raw;

pub use raw::*;
