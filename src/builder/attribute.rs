//! Custom attributes of the metadata writer.

use crate::{
    builder::heaps::write_ser_string,
    metadata::{customattributes::SERIALIZATION_TYPE, signatures::TypeSignature},
    Result,
};

/// Namespace of the interop attributes Windows metadata defines itself
const METADATA_NAMESPACE: &str = "Windows.Win32.Foundation.Metadata";

/// A fixed constructor argument
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FixedArgument {
    String(Option<String>),
    Boolean(bool),
    U1(u8),
    U2(u16),
    I4(i32),
    U4(u32),
    I8(i64),
    /// An `int32` enum value
    Enum(i32),
}

/// A named field argument
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NamedArgument {
    U2(String, u16),
    I4(String, i32),
}

/// A custom attribute to attach to a type, field, method or parameter.
///
/// Positional arguments are added in constructor order; the constructor signature is
/// derived from them.
///
/// ```rust
/// use winmdgen::builder::AttributeDef;
///
/// let size = AttributeDef::new("MemorySizeAttribute").named_u16("BytesParamIndex", 2);
/// let free = AttributeDef::new("RAIIFreeAttribute").string("CloseHandle");
/// # let _ = (size, free);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDef {
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) fixed: Vec<FixedArgument>,
    pub(crate) named: Vec<NamedArgument>,
}

impl AttributeDef {
    /// An attribute of type `name` without arguments.
    ///
    /// The namespace is picked the way Windows metadata places the attribute: the few
    /// framework attributes live under `System`, the rest under
    /// `Windows.Win32.Foundation.Metadata`.
    #[must_use]
    pub fn new(name: &str) -> AttributeDef {
        let namespace = match name {
            "ObsoleteAttribute" | "FlagsAttribute" => "System",
            "UnmanagedFunctionPointerAttribute" | "PreserveSigAttribute" => {
                "System.Runtime.InteropServices"
            }
            _ => METADATA_NAMESPACE,
        };

        AttributeDef {
            namespace: namespace.to_string(),
            name: name.to_string(),
            fixed: Vec::new(),
            named: Vec::new(),
        }
    }

    /// `GuidAttribute` carrying `guid` as its eleven integer arguments.
    #[must_use]
    pub fn guid(guid: uguid::Guid) -> AttributeDef {
        let bytes = guid.to_bytes();
        let mut attribute = AttributeDef::new("GuidAttribute")
            .u32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .u16(u16::from_le_bytes([bytes[4], bytes[5]]))
            .u16(u16::from_le_bytes([bytes[6], bytes[7]]));
        for byte in &bytes[8..] {
            attribute = attribute.u8(*byte);
        }
        attribute
    }

    /// `NativeBitfieldAttribute` declaring the bitfield `name`.
    #[must_use]
    pub fn bitfield(name: &str, offset: i64, length: i64) -> AttributeDef {
        AttributeDef::new("NativeBitfieldAttribute")
            .string(name)
            .i64(offset)
            .i64(length)
    }

    /// Adds a string argument.
    #[must_use]
    pub fn string(mut self, value: &str) -> Self {
        self.fixed.push(FixedArgument::String(Some(value.to_string())));
        self
    }

    /// Adds a null string argument.
    #[must_use]
    pub fn null_string(mut self) -> Self {
        self.fixed.push(FixedArgument::String(None));
        self
    }

    /// Adds a boolean argument.
    #[must_use]
    pub fn bool(mut self, value: bool) -> Self {
        self.fixed.push(FixedArgument::Boolean(value));
        self
    }

    /// Adds a `uint8` argument.
    #[must_use]
    pub fn u8(mut self, value: u8) -> Self {
        self.fixed.push(FixedArgument::U1(value));
        self
    }

    /// Adds a `uint16` argument.
    #[must_use]
    pub fn u16(mut self, value: u16) -> Self {
        self.fixed.push(FixedArgument::U2(value));
        self
    }

    /// Adds an `int32` argument.
    #[must_use]
    pub fn i32(mut self, value: i32) -> Self {
        self.fixed.push(FixedArgument::I4(value));
        self
    }

    /// Adds a `uint32` argument.
    #[must_use]
    pub fn u32(mut self, value: u32) -> Self {
        self.fixed.push(FixedArgument::U4(value));
        self
    }

    /// Adds an `int64` argument.
    #[must_use]
    pub fn i64(mut self, value: i64) -> Self {
        self.fixed.push(FixedArgument::I8(value));
        self
    }

    /// Adds an enum argument with an `int32` underlying value.
    #[must_use]
    pub fn enum_value(mut self, value: i32) -> Self {
        self.fixed.push(FixedArgument::Enum(value));
        self
    }

    /// Sets the `uint16` field `name`.
    #[must_use]
    pub fn named_u16(mut self, name: &str, value: u16) -> Self {
        self.named.push(NamedArgument::U2(name.to_string(), value));
        self
    }

    /// Sets the `int32` field `name`.
    #[must_use]
    pub fn named_i32(mut self, name: &str, value: i32) -> Self {
        self.named.push(NamedArgument::I4(name.to_string(), value));
        self
    }

    /// Constructor parameter types. `enum_type` is the type enum arguments are declared as.
    pub(crate) fn constructor_params(&self, enum_type: &TypeSignature) -> Vec<TypeSignature> {
        self.fixed
            .iter()
            .map(|argument| match argument {
                FixedArgument::String(_) => TypeSignature::String,
                FixedArgument::Boolean(_) => TypeSignature::Boolean,
                FixedArgument::U1(_) => TypeSignature::U1,
                FixedArgument::U2(_) => TypeSignature::U2,
                FixedArgument::I4(_) => TypeSignature::I4,
                FixedArgument::U4(_) => TypeSignature::U4,
                FixedArgument::I8(_) => TypeSignature::I8,
                FixedArgument::Enum(_) => enum_type.clone(),
            })
            .collect()
    }

    /// Returns `true` if a constructor parameter is an enum.
    pub(crate) fn has_enum_argument(&self) -> bool {
        self.fixed
            .iter()
            .any(|argument| matches!(argument, FixedArgument::Enum(_)))
    }

    /// Encodes the value blob: prolog, fixed arguments, named arguments.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn value_blob(&self) -> Result<Vec<u8>> {
        let mut blob = 0x0001u16.to_le_bytes().to_vec();

        for argument in &self.fixed {
            match argument {
                FixedArgument::String(value) => write_ser_string(value.as_deref(), &mut blob)?,
                FixedArgument::Boolean(value) => blob.push(u8::from(*value)),
                FixedArgument::U1(value) => blob.push(*value),
                FixedArgument::U2(value) => blob.extend_from_slice(&value.to_le_bytes()),
                FixedArgument::I4(value) | FixedArgument::Enum(value) => {
                    blob.extend_from_slice(&value.to_le_bytes());
                }
                FixedArgument::U4(value) => blob.extend_from_slice(&value.to_le_bytes()),
                FixedArgument::I8(value) => blob.extend_from_slice(&value.to_le_bytes()),
            }
        }

        blob.extend_from_slice(&(self.named.len() as u16).to_le_bytes());
        for argument in &self.named {
            blob.push(SERIALIZATION_TYPE::FIELD);
            match argument {
                NamedArgument::U2(name, value) => {
                    blob.push(SERIALIZATION_TYPE::U2);
                    write_ser_string(Some(name), &mut blob)?;
                    blob.extend_from_slice(&value.to_le_bytes());
                }
                NamedArgument::I4(name, value) => {
                    blob.push(SERIALIZATION_TYPE::I4);
                    write_ser_string(Some(name), &mut blob)?;
                    blob.extend_from_slice(&value.to_le_bytes());
                }
            }
        }

        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        customattributes::{
            parse_custom_attribute_blob, CustomAttributeArgument, KnownAttribute,
        },
        signatures::SignatureParameter,
        tables::TableId,
    };

    fn decode(attribute: &AttributeDef) -> Option<KnownAttribute> {
        let enum_type = TypeSignature::ValueType(TableId::TypeRef.token(1));
        let params: Vec<SignatureParameter> = attribute
            .constructor_params(&enum_type)
            .into_iter()
            .map(|base| SignatureParameter {
                base,
                ..SignatureParameter::default()
            })
            .collect();
        let value = parse_custom_attribute_blob(&attribute.value_blob().unwrap(), &params).unwrap();
        KnownAttribute::decode(&attribute.name, &value).unwrap()
    }

    #[test]
    fn known_attributes_decode() {
        let guid = uguid::guid!("6d5140c1-7436-11ce-8034-00aa006009fa");
        assert_eq!(
            decode(&AttributeDef::guid(guid)),
            Some(KnownAttribute::Guid(guid))
        );
        assert_eq!(
            decode(&AttributeDef::bitfield("Level", 3, 4)),
            Some(KnownAttribute::NativeBitfield {
                name: "Level".to_string(),
                offset: 3,
                length: 4
            })
        );
        assert_eq!(
            decode(&AttributeDef::new("MemorySizeAttribute").named_u16("BytesParamIndex", 2)),
            Some(KnownAttribute::MemorySize(Some(2)))
        );
        assert_eq!(
            decode(&AttributeDef::new("UnmanagedFunctionPointerAttribute").enum_value(2)),
            Some(KnownAttribute::UnmanagedFunctionPointer(2))
        );
        assert_eq!(
            decode(&AttributeDef::new("PreserveSigAttribute").bool(false)),
            Some(KnownAttribute::PreserveSig(false))
        );
    }

    #[test]
    fn null_strings() {
        let attribute = AttributeDef::new("ObsoleteAttribute").null_string();
        assert_eq!(attribute.namespace, "System");
        assert_eq!(attribute.value_blob().unwrap(), [0x01, 0x00, 0xFF, 0x00, 0x00]);

        let params = vec![SignatureParameter {
            base: TypeSignature::String,
            ..SignatureParameter::default()
        }];
        let value = parse_custom_attribute_blob(&attribute.value_blob().unwrap(), &params).unwrap();
        assert_eq!(value.fixed_args, vec![CustomAttributeArgument::Null]);
    }
}
