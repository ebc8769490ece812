//! Constant table (`0x0B`, ECMA-335 II.22.9).
//!
//! `base` holds the element type of the value (`0x02` boolean up to `0x0E` string, or
//! `0x12` for a null class reference) and `value` the little-endian encoded bytes.

mod raw;

pub use raw::*;
