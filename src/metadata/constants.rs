//! Literal values of constant fields and enum members.
//!
//! Values come from two places. Numeric, character and string literals are stored in the
//! `#Blob` heap and referenced by a Constant row, tagged with the element type of the value.
//! GUID constants have no Constant row at all; they are encoded as a `GuidAttribute` on the
//! field and reconstructed from its eleven arguments.

use std::fmt::Write;

use widestring::U16Str;

use crate::{
    metadata::{
        customattributes::KnownAttribute,
        tables::FieldRaw,
        typesystem::ELEMENT_TYPE,
        view::Metadata,
    },
    Error, Result,
};

/// A decoded literal
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// `bool`
    Boolean(bool),
    /// UTF-16 code unit
    Char(u16),
    /// `i8`
    I1(i8),
    /// `u8`
    U1(u8),
    /// `i16`
    I2(i16),
    /// `u16`
    U2(u16),
    /// `i32`
    I4(i32),
    /// `u32`
    U4(u32),
    /// `i64`
    I8(i64),
    /// `u64`
    U8(u64),
    /// `f32`
    R4(f32),
    /// `f64`
    R8(f64),
    /// String literal
    String(String),
    /// GUID reconstructed from a `GuidAttribute`
    Guid(uguid::Guid),
    /// Null reference
    Null,
}

fn fixed<const N: usize>(data: &[u8]) -> Result<[u8; N]> {
    data.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(out_of_bounds_error!())
}

impl ConstantValue {
    /// Decodes the blob of a Constant row whose element type is `base`.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if the blob is shorter than the value, and
    /// [`Error::Unsupported`] for element types a constant cannot have.
    pub fn read(base: u8, data: &[u8]) -> Result<ConstantValue> {
        let value = match base {
            ELEMENT_TYPE::BOOLEAN => ConstantValue::Boolean(fixed::<1>(data)?[0] != 0),
            ELEMENT_TYPE::CHAR => ConstantValue::Char(u16::from_le_bytes(fixed(data)?)),
            ELEMENT_TYPE::I1 => ConstantValue::I1(i8::from_le_bytes(fixed(data)?)),
            ELEMENT_TYPE::U1 => ConstantValue::U1(fixed::<1>(data)?[0]),
            ELEMENT_TYPE::I2 => ConstantValue::I2(i16::from_le_bytes(fixed(data)?)),
            ELEMENT_TYPE::U2 => ConstantValue::U2(u16::from_le_bytes(fixed(data)?)),
            ELEMENT_TYPE::I4 => ConstantValue::I4(i32::from_le_bytes(fixed(data)?)),
            ELEMENT_TYPE::U4 => ConstantValue::U4(u32::from_le_bytes(fixed(data)?)),
            ELEMENT_TYPE::I8 => ConstantValue::I8(i64::from_le_bytes(fixed(data)?)),
            ELEMENT_TYPE::U8 => ConstantValue::U8(u64::from_le_bytes(fixed(data)?)),
            ELEMENT_TYPE::R4 => ConstantValue::R4(f32::from_le_bytes(fixed(data)?)),
            ELEMENT_TYPE::R8 => ConstantValue::R8(f64::from_le_bytes(fixed(data)?)),
            ELEMENT_TYPE::STRING => {
                if data.len() % 2 != 0 {
                    return Err(malformed_error!(
                        "String constant of odd length - {}",
                        data.len()
                    ));
                }
                let units: Vec<u16> = data
                    .chunks_exact(2)
                    .map(|unit| u16::from_le_bytes([unit[0], unit[1]]))
                    .collect();
                ConstantValue::String(U16Str::from_slice(&units).to_string_lossy())
            }
            ELEMENT_TYPE::CLASS => ConstantValue::Null,
            other => {
                return Err(Error::Unsupported(format!(
                    "constant of element type 0x{other:02X}"
                )))
            }
        };

        Ok(value)
    }

    /// The value as a signed 64-bit integer, for integral and character constants. Unsigned
    /// 64-bit values keep their bit pattern.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConstantValue::Boolean(value) => Some(i64::from(*value)),
            ConstantValue::Char(value) | ConstantValue::U2(value) => Some(i64::from(*value)),
            ConstantValue::I1(value) => Some(i64::from(*value)),
            ConstantValue::U1(value) => Some(i64::from(*value)),
            ConstantValue::I2(value) => Some(i64::from(*value)),
            ConstantValue::I4(value) => Some(i64::from(*value)),
            ConstantValue::U4(value) => Some(i64::from(*value)),
            ConstantValue::I8(value) => Some(*value),
            ConstantValue::U8(value) => Some(*value as i64),
            _ => None,
        }
    }

    /// Renders the value as an AutoHotkey v2 literal.
    ///
    /// Integers are decimal except bytes, which are two-digit hex. Floats use their shortest
    /// round-trip form. Strings and GUIDs are quoted; GUIDs use the braced registry form.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn to_literal(&self) -> String {
        match self {
            ConstantValue::Boolean(value) => i32::from(*value).to_string(),
            ConstantValue::Char(value) | ConstantValue::U2(value) => value.to_string(),
            ConstantValue::I1(value) => format!("0x{:02X}", *value as u8),
            ConstantValue::U1(value) => format!("0x{value:02X}"),
            ConstantValue::I2(value) => value.to_string(),
            ConstantValue::I4(value) => value.to_string(),
            ConstantValue::U4(value) => value.to_string(),
            ConstantValue::I8(value) => value.to_string(),
            ConstantValue::U8(value) => value.to_string(),
            ConstantValue::R4(value) => float_literal(f64::from(*value), &value.to_string()),
            ConstantValue::R8(value) => float_literal(*value, &value.to_string()),
            ConstantValue::String(value) => quote(value),
            ConstantValue::Guid(guid) => {
                format!("\"{{{}}}\"", guid.to_string().to_ascii_uppercase())
            }
            ConstantValue::Null => "0".to_string(),
        }
    }
}

fn float_literal(value: f64, shortest: &str) -> String {
    if !value.is_finite() {
        return quote(shortest);
    }
    if shortest.contains(['.', 'e', 'E']) {
        shortest.to_string()
    } else {
        format!("{shortest}.0")
    }
}

/// Quotes `value` as an AutoHotkey string literal.
///
/// Newlines, tabs and carriage returns become backtick escapes, quotes and backticks are
/// escaped with a backtick, and other control characters are written as `\uXXXX`.
#[must_use]
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for character in value.chars() {
        match character {
            '\n' => quoted.push_str("`n"),
            '\t' => quoted.push_str("`t"),
            '\r' => quoted.push_str("`r"),
            '"' => quoted.push_str("`\""),
            '`' => quoted.push_str("``"),
            control if control.is_control() => {
                let _ = write!(quoted, "\\u{:04x}", u32::from(control));
            }
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// The literal value of constant field `field`: its Constant row, or failing that its
/// `GuidAttribute`. `None` for fields that carry neither.
///
/// # Errors
/// Returns an error if the Constant blob or the attribute cannot be decoded.
pub fn field_constant(metadata: &Metadata, field: &FieldRaw) -> Result<Option<ConstantValue>> {
    if let Some(constant) = metadata.constant(field.token) {
        return ConstantValue::read(constant.base, metadata.blob(constant.value)?).map(Some);
    }

    Ok(metadata
        .known_attributes(field.token)?
        .into_iter()
        .find_map(|attribute| match attribute {
            KnownAttribute::Guid(guid) => Some(ConstantValue::Guid(guid)),
            _ => None,
        }))
}
