//! MethodDef table (`0x06`, ECMA-335 II.22.26).

mod raw;

pub use raw::*;

#[allow(non_snake_case)]
/// Flag constants of `MethodDef.Flags`.
pub mod MethodAttributes {
    /// Method is defined on the type
    pub const STATIC: u32 = 0x0010;
    /// Method takes a vtable slot
    pub const VIRTUAL: u32 = 0x0040;
    /// Method gets a new vtable slot
    pub const NEW_SLOT: u32 = 0x0100;
    /// Method has no body
    pub const ABSTRACT: u32 = 0x0400;
    /// Name is special, e.g. `.ctor`
    pub const SPECIAL_NAME: u32 = 0x0800;
    /// Implementation is forwarded through P/Invoke
    pub const PINVOKE_IMPL: u32 = 0x2000;
}

#[allow(non_snake_case)]
/// Flag constants of `MethodDef.ImplFlags`.
pub mod MethodImplAttributes {
    /// Signature is exported exactly as declared, no HRESULT conversion
    pub const PRESERVE_SIG: u32 = 0x0080;
}
