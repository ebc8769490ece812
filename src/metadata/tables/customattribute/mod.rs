//! CustomAttribute table (`0x0C`, ECMA-335 II.22.10).
//!
//! Windows metadata pushes most of its native semantics into attributes: GUIDs, native
//! typedefs, `[Const]`, `[NativeArrayInfo]`, `[SupportedArchitecture]` and many more. The
//! decoded form lives in [`crate::metadata::customattributes`].

mod raw;

pub use raw::*;
