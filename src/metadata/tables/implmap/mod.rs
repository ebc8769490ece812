//! ImplMap table (`0x1C`, ECMA-335 II.22.22).
//!
//! Every exported function of a Windows metadata `Apis` class has one row that names the
//! DLL, the entry point and the P/Invoke flags.

mod raw;

pub use raw::*;

#[allow(non_snake_case)]
/// Flag constants of `ImplMap.MappingFlags`.
pub mod PInvokeAttributes {
    /// Entry point name is used as-is
    pub const NO_MANGLE: u32 = 0x0001;
    /// Mask for the character set bits
    pub const CHAR_SET_MASK: u32 = 0x0006;
    /// No character set specified
    pub const CHAR_SET_NOT_SPEC: u32 = 0x0000;
    /// Strings are marshalled as ANSI
    pub const CHAR_SET_ANSI: u32 = 0x0002;
    /// Strings are marshalled as UTF-16
    pub const CHAR_SET_UNICODE: u32 = 0x0004;
    /// Platform picks the character set
    pub const CHAR_SET_AUTO: u32 = 0x0006;
    /// Callee sets the thread's last error
    pub const SUPPORTS_LAST_ERROR: u32 = 0x0040;
    /// Mask for the calling convention bits
    pub const CALL_CONV_MASK: u32 = 0x0700;
    /// Platform default calling convention
    pub const CALL_CONV_WINAPI: u32 = 0x0100;
    /// `__cdecl`
    pub const CALL_CONV_CDECL: u32 = 0x0200;
    /// `__stdcall`
    pub const CALL_CONV_STDCALL: u32 = 0x0300;
    /// `__thiscall`
    pub const CALL_CONV_THISCALL: u32 = 0x0400;
    /// `__fastcall`
    pub const CALL_CONV_FASTCALL: u32 = 0x0500;
}
