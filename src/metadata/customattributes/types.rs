//! Decoded custom attribute arguments.

use crate::{
    metadata::{
        customattributes::{parse_custom_attribute_blob, KnownAttribute},
        signatures::SignatureParameter,
        token::Token,
    },
    Result,
};

/// A custom attribute applied to a metadata row, with its value still encoded
#[derive(Debug, Clone)]
pub struct CustomAttribute<'a> {
    /// Token of the row the attribute is applied to
    pub parent: Token,
    /// Type name of the attribute, including the `Attribute` suffix
    pub name: &'a str,
    /// Namespace of the attribute type
    pub namespace: &'a str,
    /// The encoded value blob
    pub blob: &'a [u8],
    /// Parameters of the attribute constructor
    pub params: Vec<SignatureParameter>,
}

impl CustomAttribute<'_> {
    /// Decodes the value blob against the constructor parameters.
    ///
    /// # Errors
    /// See [`parse_custom_attribute_blob`].
    pub fn value(&self) -> Result<CustomAttributeValue> {
        parse_custom_attribute_blob(self.blob, &self.params)
    }

    /// Decodes the attribute if it belongs to the supported set.
    ///
    /// The blob of an unrecognized attribute is never parsed.
    ///
    /// # Errors
    /// Returns an error if the blob of a recognized attribute is malformed or lacks a
    /// required argument.
    pub fn known(&self) -> Result<Option<KnownAttribute>> {
        if !KnownAttribute::recognizes(self.name) {
            return Ok(None);
        }

        KnownAttribute::decode(self.name, &self.value()?)
    }

    /// Returns `true` if the attribute type is `name` or `name` + `Attribute`.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name
            .strip_suffix("Attribute")
            .unwrap_or(self.name)
            == name.strip_suffix("Attribute").unwrap_or(name)
    }
}

/// A parsed custom attribute value with its arguments
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomAttributeValue {
    /// Fixed arguments in constructor parameter order
    pub fixed_args: Vec<CustomAttributeArgument>,
    /// Named arguments (fields and properties)
    pub named_args: Vec<CustomAttributeNamedArgument>,
}

impl CustomAttributeValue {
    /// Returns the named argument called `name`.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&CustomAttributeArgument> {
        self.named_args
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }
}

/// A single custom attribute argument value
#[derive(Debug, Clone, PartialEq)]
pub enum CustomAttributeArgument {
    /// Boolean value
    Bool(bool),
    /// UTF-16 code unit
    Char(u16),
    /// Signed 8-bit integer
    I1(i8),
    /// Unsigned 8-bit integer
    U1(u8),
    /// Signed 16-bit integer
    I2(i16),
    /// Unsigned 16-bit integer
    U2(u16),
    /// Signed 32-bit integer
    I4(i32),
    /// Unsigned 32-bit integer
    U4(u32),
    /// Signed 64-bit integer
    I8(i64),
    /// Unsigned 64-bit integer
    U8(u64),
    /// 32-bit floating point
    R4(f32),
    /// 64-bit floating point
    R8(f64),
    /// UTF-8 string
    String(String),
    /// Type name, as serialized for `System.Type` arguments
    Type(String),
    /// A null string or type
    Null,
    /// Enum value: enum type name, if serialized, and the underlying value
    Enum(Option<String>, Box<CustomAttributeArgument>),
}

impl CustomAttributeArgument {
    /// Widens any integer argument, including enum values, to `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CustomAttributeArgument::I1(value) => Some(i64::from(*value)),
            CustomAttributeArgument::U1(value) => Some(i64::from(*value)),
            CustomAttributeArgument::I2(value) => Some(i64::from(*value)),
            CustomAttributeArgument::U2(value) | CustomAttributeArgument::Char(value) => {
                Some(i64::from(*value))
            }
            CustomAttributeArgument::I4(value) => Some(i64::from(*value)),
            CustomAttributeArgument::U4(value) => Some(i64::from(*value)),
            CustomAttributeArgument::I8(value) => Some(*value),
            #[allow(clippy::cast_possible_wrap)]
            CustomAttributeArgument::U8(value) => Some(*value as i64),
            CustomAttributeArgument::Enum(_, value) => value.as_i64(),
            _ => None,
        }
    }

    /// Returns the string of a `String` or `Type` argument.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CustomAttributeArgument::String(value) | CustomAttributeArgument::Type(value) => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Returns the value of a `Bool` argument.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CustomAttributeArgument::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

/// A named argument (field or property) of a custom attribute
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeNamedArgument {
    /// Whether this is a field (true) or property (false)
    pub is_field: bool,
    /// Name of the field or property
    pub name: String,
    /// Value of the argument
    pub value: CustomAttributeArgument,
}

/// .NET `CorSerializationType` constants as defined in corhdr.h
#[allow(non_snake_case, missing_docs)]
pub mod SERIALIZATION_TYPE {
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0A;
    pub const U8: u8 = 0x0B;
    pub const R4: u8 = 0x0C;
    pub const R8: u8 = 0x0D;
    pub const STRING: u8 = 0x0E;
    pub const SZARRAY: u8 = 0x1D;
    pub const TYPE: u8 = 0x50;
    pub const TAGGED_OBJECT: u8 = 0x51;
    pub const FIELD: u8 = 0x53;
    pub const PROPERTY: u8 = 0x54;
    pub const ENUM: u8 = 0x55;
}
