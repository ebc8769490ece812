//! ClassLayout table (`0x0F`, ECMA-335 II.22.8).

mod raw;

pub use raw::*;
