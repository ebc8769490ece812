//! MemberRef table (`0x0A`, ECMA-335 II.22.25).

mod raw;

pub use raw::*;
