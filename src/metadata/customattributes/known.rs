//! The closed set of attributes that carry native semantics in Windows metadata.
//!
//! Attributes are matched by their type name only. The namespace is not checked, since the
//! same names appear under `Windows.Win32.Foundation.Metadata`, `Windows.Win32.Interop` and
//! `System.Runtime.InteropServices` depending on the metadata version.

use crate::{
    metadata::customattributes::{CustomAttributeArgument, CustomAttributeValue},
    Error, Result,
};

/// A decoded attribute from the supported set
#[derive(Debug, Clone, PartialEq)]
pub enum KnownAttribute {
    /// `GuidAttribute(uint, ushort, ushort, byte x 8)`
    Guid(uguid::Guid),
    /// `NativeTypedefAttribute`
    NativeTypedef,
    /// `NativeBitfieldAttribute(string name, long offset, long length)`
    NativeBitfield {
        /// Sub-field name
        name: String,
        /// Bit offset inside the backing member
        offset: u32,
        /// Number of bits
        length: u32,
    },
    /// `StructSizeFieldAttribute(string)`
    StructSizeField(String),
    /// `ReservedAttribute`
    Reserved,
    /// `ObsoleteAttribute`, with its message if any
    Obsolete(Option<String>),
    /// `AnsiAttribute`
    Ansi,
    /// `UnicodeAttribute`
    Unicode,
    /// `ConstAttribute`
    Const,
    /// `SupportedOSPlatformAttribute(string)`
    SupportedOsPlatform(String),
    /// `SupportedArchitectureAttribute(Architecture)`
    SupportedArchitecture(u32),
    /// `RAIIFreeAttribute(string)`
    RaiiFree(String),
    /// `InvalidHandleValueAttribute(long)`
    InvalidHandleValue(i64),
    /// `UnmanagedFunctionPointerAttribute(CallingConvention)`
    UnmanagedFunctionPointer(i32),
    /// `MemorySizeAttribute`, with `BytesParamIndex`
    MemorySize(Option<u16>),
    /// `NativeArrayInfoAttribute`, with `CountConst` and `CountParamIndex`
    NativeArrayInfo {
        /// Fixed element count
        count_const: Option<i32>,
        /// Parameter holding the element count
        count_param_index: Option<u16>,
    },
    /// `RetValAttribute`
    RetVal,
    /// `ComOutPtrAttribute`
    ComOutPtr,
    /// `DoNotReleaseAttribute`
    DoNotRelease,
    /// `IgnoreIfReturnAttribute(string)`
    IgnoreIfReturn(String),
    /// `PreserveSigAttribute`, with its flag (`true` when absent)
    PreserveSig(bool),
    /// `CanReturnMultipleSuccessValuesAttribute`
    CanReturnMultipleSuccessValues,
    /// `CanReturnErrorsAsSuccessAttribute`
    CanReturnErrorsAsSuccess,
    /// `FlagsAttribute`
    Flags,
}

fn string_arg(name: &str, value: &CustomAttributeValue, index: usize) -> Result<String> {
    value
        .fixed_args
        .get(index)
        .and_then(CustomAttributeArgument::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::MissingData(format!("{name}: string argument {index}")))
}

fn int_arg(name: &str, value: &CustomAttributeValue, index: usize) -> Result<i64> {
    value
        .fixed_args
        .get(index)
        .and_then(CustomAttributeArgument::as_i64)
        .ok_or_else(|| Error::MissingData(format!("{name}: integer argument {index}")))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn guid_from_args(value: &CustomAttributeValue) -> Result<uguid::Guid> {
    let missing = || Error::MissingData("GuidAttribute: 11 integer arguments".to_string());
    if value.fixed_args.len() != 11 {
        return Err(missing());
    }

    let ints = value
        .fixed_args
        .iter()
        .map(CustomAttributeArgument::as_i64)
        .collect::<Option<Vec<i64>>>()
        .ok_or_else(missing)?;

    let mut bytes = [0u8; 16];
    bytes[0..4].copy_from_slice(&(ints[0] as u32).to_le_bytes());
    bytes[4..6].copy_from_slice(&(ints[1] as u16).to_le_bytes());
    bytes[6..8].copy_from_slice(&(ints[2] as u16).to_le_bytes());
    for (slot, value) in bytes[8..].iter_mut().zip(&ints[3..]) {
        *slot = *value as u8;
    }

    Ok(uguid::Guid::from_bytes(bytes))
}

/// Type names of the supported set, without the `Attribute` suffix
const KNOWN_NAMES: &[&str] = &[
    "Guid",
    "NativeTypedef",
    "NativeBitfield",
    "StructSizeField",
    "Reserved",
    "Obsolete",
    "Ansi",
    "Unicode",
    "Const",
    "SupportedOSPlatform",
    "SupportedArchitecture",
    "RAIIFree",
    "InvalidHandleValue",
    "UnmanagedFunctionPointer",
    "MemorySize",
    "NativeArrayInfo",
    "RetVal",
    "ComOutPtr",
    "DoNotRelease",
    "IgnoreIfReturn",
    "PreserveSig",
    "CanReturnMultipleSuccessValues",
    "CanReturnErrorsAsSuccess",
    "Flags",
];

impl KnownAttribute {
    /// Returns `true` if `name` belongs to the supported set.
    ///
    /// Used to skip argument decoding for attributes whose blobs may use shapes the
    /// positional decoder does not understand.
    #[must_use]
    pub fn recognizes(name: &str) -> bool {
        let name = name.strip_suffix("Attribute").unwrap_or(name);
        KNOWN_NAMES.contains(&name)
    }

    /// Decodes an attribute by type name. Returns `Ok(None)` for attributes outside the
    /// supported set.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingData`] if a supported attribute lacks a required argument.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn decode(name: &str, value: &CustomAttributeValue) -> Result<Option<KnownAttribute>> {
        let name = name.strip_suffix("Attribute").unwrap_or(name);

        let attribute = match name {
            "Guid" => KnownAttribute::Guid(guid_from_args(value)?),
            "NativeTypedef" => KnownAttribute::NativeTypedef,
            "NativeBitfield" => KnownAttribute::NativeBitfield {
                name: string_arg(name, value, 0)?,
                offset: int_arg(name, value, 1)? as u32,
                length: int_arg(name, value, 2)? as u32,
            },
            "StructSizeField" => KnownAttribute::StructSizeField(string_arg(name, value, 0)?),
            "Reserved" => KnownAttribute::Reserved,
            "Obsolete" => KnownAttribute::Obsolete(
                value
                    .fixed_args
                    .first()
                    .and_then(CustomAttributeArgument::as_str)
                    .map(str::to_string),
            ),
            "Ansi" => KnownAttribute::Ansi,
            "Unicode" => KnownAttribute::Unicode,
            "Const" => KnownAttribute::Const,
            "SupportedOSPlatform" => {
                KnownAttribute::SupportedOsPlatform(string_arg(name, value, 0)?)
            }
            "SupportedArchitecture" => {
                KnownAttribute::SupportedArchitecture(int_arg(name, value, 0)? as u32)
            }
            "RAIIFree" => KnownAttribute::RaiiFree(string_arg(name, value, 0)?),
            "InvalidHandleValue" => KnownAttribute::InvalidHandleValue(int_arg(name, value, 0)?),
            "UnmanagedFunctionPointer" => KnownAttribute::UnmanagedFunctionPointer(
                value
                    .fixed_args
                    .first()
                    .and_then(CustomAttributeArgument::as_i64)
                    .unwrap_or(1) as i32,
            ),
            "MemorySize" => KnownAttribute::MemorySize(
                value
                    .named("BytesParamIndex")
                    .and_then(CustomAttributeArgument::as_i64)
                    .map(|index| index as u16),
            ),
            "NativeArrayInfo" => KnownAttribute::NativeArrayInfo {
                count_const: value
                    .named("CountConst")
                    .and_then(CustomAttributeArgument::as_i64)
                    .map(|count| count as i32),
                count_param_index: value
                    .named("CountParamIndex")
                    .and_then(CustomAttributeArgument::as_i64)
                    .map(|index| index as u16),
            },
            "RetVal" => KnownAttribute::RetVal,
            "ComOutPtr" => KnownAttribute::ComOutPtr,
            "DoNotRelease" => KnownAttribute::DoNotRelease,
            "IgnoreIfReturn" => KnownAttribute::IgnoreIfReturn(string_arg(name, value, 0)?),
            "PreserveSig" => KnownAttribute::PreserveSig(
                value
                    .fixed_args
                    .first()
                    .and_then(CustomAttributeArgument::as_bool)
                    .unwrap_or(true),
            ),
            "CanReturnMultipleSuccessValues" => KnownAttribute::CanReturnMultipleSuccessValues,
            "CanReturnErrorsAsSuccess" => KnownAttribute::CanReturnErrorsAsSuccess,
            "Flags" => KnownAttribute::Flags,
            _ => return Ok(None),
        };

        Ok(Some(attribute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::customattributes::CustomAttributeNamedArgument;

    fn fixed(args: Vec<CustomAttributeArgument>) -> CustomAttributeValue {
        CustomAttributeValue {
            fixed_args: args,
            named_args: Vec::new(),
        }
    }

    #[test]
    fn guid() {
        // 00000000-0000-0000-C000-000000000046, IUnknown
        let mut args = vec![
            CustomAttributeArgument::U4(0),
            CustomAttributeArgument::U2(0),
            CustomAttributeArgument::U2(0),
            CustomAttributeArgument::U1(0xC0),
        ];
        args.extend(std::iter::repeat(CustomAttributeArgument::U1(0)).take(6));
        args.push(CustomAttributeArgument::U1(0x46));

        let decoded = KnownAttribute::decode("GuidAttribute", &fixed(args)).unwrap();
        let Some(KnownAttribute::Guid(guid)) = decoded else {
            panic!("expected a guid");
        };
        assert_eq!(guid.to_string(), "00000000-0000-0000-c000-000000000046");
    }

    #[test]
    fn bitfield() {
        let decoded = KnownAttribute::decode(
            "NativeBitfieldAttribute",
            &fixed(vec![
                CustomAttributeArgument::String("fFlag".to_string()),
                CustomAttributeArgument::I8(3),
                CustomAttributeArgument::I8(4),
            ]),
        )
        .unwrap();
        assert_eq!(
            decoded,
            Some(KnownAttribute::NativeBitfield {
                name: "fFlag".to_string(),
                offset: 3,
                length: 4
            })
        );
    }

    #[test]
    fn missing_arguments() {
        assert!(matches!(
            KnownAttribute::decode("StructSizeFieldAttribute", &fixed(Vec::new())),
            Err(Error::MissingData(_))
        ));
        assert!(matches!(
            KnownAttribute::decode("GuidAttribute", &fixed(vec![CustomAttributeArgument::U4(1)])),
            Err(Error::MissingData(_))
        ));
    }

    #[test]
    fn named_and_defaults() {
        let value = CustomAttributeValue {
            fixed_args: Vec::new(),
            named_args: vec![CustomAttributeNamedArgument {
                is_field: true,
                name: "BytesParamIndex".to_string(),
                value: CustomAttributeArgument::I2(3),
            }],
        };
        assert_eq!(
            KnownAttribute::decode("MemorySizeAttribute", &value).unwrap(),
            Some(KnownAttribute::MemorySize(Some(3)))
        );
        assert_eq!(
            KnownAttribute::decode("PreserveSigAttribute", &fixed(Vec::new())).unwrap(),
            Some(KnownAttribute::PreserveSig(true))
        );
        assert_eq!(
            KnownAttribute::decode("DocumentationAttribute", &fixed(Vec::new())).unwrap(),
            None
        );
    }

    #[test]
    fn recognizes() {
        assert!(KnownAttribute::recognizes("NativeTypedefAttribute"));
        assert!(KnownAttribute::recognizes("Flags"));
        assert!(!KnownAttribute::recognizes("DocumentationAttribute"));
    }
}
