//! Scalar and string values moved between Rust and struct memory.

use std::fmt;

use widestring::U16Str;

use crate::{
    file::io::{read_le_at, write_le_at},
    metadata::typesystem::{char_width, PrimitiveKind, TypeDescriptor},
    Error, Result,
};

/// A value read from, or to be written to, a struct member
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer, `HRESULT` and `BOOL` included
    Int(i64),
    /// Unsigned integer
    UInt(u64),
    /// `float` or `double`
    Float(f64),
    /// Pointer-sized value: pointers, handles, interface pointers
    Pointer(u64),
    /// Contents of an inline character buffer, up to its first NUL
    String(String),
}

impl Value {
    /// The value as raw integer bits, for integer and pointer members.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn bits(&self) -> Option<u64> {
        match self {
            Value::Int(value) => Some(*value as u64),
            Value::UInt(value) | Value::Pointer(value) => Some(*value),
            Value::Float(value) => Some(*value as i64 as u64),
            Value::String(_) => None,
        }
    }

    /// The value as a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::UInt(value) | Value::Pointer(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            Value::String(_) => None,
        }
    }

    /// The text of a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::UInt(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Pointer(value) => write!(f, "{value:#x}"),
            Value::String(value) => write!(f, "{value:?}"),
        }
    }
}

/// How a scalar member is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scalar {
    Signed(u32),
    Unsigned(u32),
    Float(u32),
    Pointer,
}

impl Scalar {
    /// Storage of `descriptor`, `None` for arrays, strings and structs.
    pub(crate) fn of(descriptor: &TypeDescriptor) -> Option<Scalar> {
        match descriptor.terminal() {
            TypeDescriptor::Primitive { kind, .. } if kind.is_float() => {
                Some(Scalar::Float(kind.width()))
            }
            TypeDescriptor::Primitive { kind, .. }
                if kind.is_pointer_sized() || *kind == PrimitiveKind::Void =>
            {
                Some(Scalar::Pointer)
            }
            TypeDescriptor::Primitive { kind, .. } if kind.is_signed() => {
                Some(Scalar::Signed(kind.width()))
            }
            TypeDescriptor::Primitive { kind, .. } => Some(Scalar::Unsigned(kind.width())),
            TypeDescriptor::Hresult => Some(Scalar::Signed(4)),
            TypeDescriptor::Pointer { .. }
            | TypeDescriptor::ComInterface(_)
            | TypeDescriptor::FunctionPointer(_) => Some(Scalar::Pointer),
            _ => None,
        }
    }

    /// Reads the raw bits at `offset`, zero-extended.
    pub(crate) fn read_bits(self, data: &[u8], offset: usize) -> Result<u64> {
        let mut offset = offset;
        match self.width() {
            1 => Ok(u64::from(read_le_at::<u8>(data, &mut offset)?)),
            2 => Ok(u64::from(read_le_at::<u16>(data, &mut offset)?)),
            4 => Ok(u64::from(read_le_at::<u32>(data, &mut offset)?)),
            _ => read_le_at::<u64>(data, &mut offset),
        }
    }

    /// Writes the low bits of `bits` at `offset`.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn write_bits(self, data: &mut [u8], offset: usize, bits: u64) -> Result<()> {
        let mut offset = offset;
        match self.width() {
            1 => write_le_at(data, &mut offset, bits as u8),
            2 => write_le_at(data, &mut offset, bits as u16),
            4 => write_le_at(data, &mut offset, bits as u32),
            _ => write_le_at(data, &mut offset, bits),
        }
    }

    fn width(self) -> u32 {
        match self {
            Scalar::Signed(width) | Scalar::Unsigned(width) | Scalar::Float(width) => width,
            Scalar::Pointer => 8,
        }
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub(crate) fn read(self, data: &[u8], offset: usize) -> Result<Value> {
        let bits = self.read_bits(data, offset)?;
        Ok(match self {
            Scalar::Signed(1) => Value::Int(i64::from(bits as u8 as i8)),
            Scalar::Signed(2) => Value::Int(i64::from(bits as u16 as i16)),
            Scalar::Signed(4) => Value::Int(i64::from(bits as u32 as i32)),
            Scalar::Signed(_) => Value::Int(bits as i64),
            Scalar::Unsigned(_) => Value::UInt(bits),
            Scalar::Float(4) => Value::Float(f64::from(f32::from_bits(bits as u32))),
            Scalar::Float(_) => Value::Float(f64::from_bits(bits)),
            Scalar::Pointer => Value::Pointer(bits),
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn write(self, data: &mut [u8], offset: usize, value: &Value) -> Result<()> {
        let bits = match self {
            Scalar::Float(4) => u64::from((value_f64(value)? as f32).to_bits()),
            Scalar::Float(_) => value_f64(value)?.to_bits(),
            _ => value
                .bits()
                .ok_or_else(|| Error::Unsupported(format!("cannot store {value} as an integer")))?,
        };
        self.write_bits(data, offset, bits)
    }
}

fn value_f64(value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| Error::Unsupported(format!("cannot store {value} as a float")))
}

/// Decodes an inline character buffer of `length` characters, stopping at the first NUL.
pub(crate) fn read_string(data: &[u8], offset: usize, length: u32, wide: bool) -> Result<Value> {
    let end = offset + (length * char_width(wide)) as usize;
    let Some(bytes) = data.get(offset..end) else {
        return Err(out_of_bounds_error!());
    };

    let text = if wide {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|unit| u16::from_le_bytes([unit[0], unit[1]]))
            .take_while(|unit| *unit != 0)
            .collect();
        U16Str::from_slice(&units).to_string_lossy()
    } else {
        let terminated = bytes.iter().position(|byte| *byte == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..terminated]).into_owned()
    };

    Ok(Value::String(text))
}

/// Encodes `text` into an inline character buffer of `length` characters.
///
/// The text is truncated to leave room for the terminator and the rest of the buffer is
/// zeroed.
pub(crate) fn write_string(
    data: &mut [u8],
    offset: usize,
    length: u32,
    wide: bool,
    text: &str,
) -> Result<()> {
    let end = offset + (length * char_width(wide)) as usize;
    let Some(buffer) = data.get_mut(offset..end) else {
        return Err(out_of_bounds_error!());
    };
    buffer.fill(0);

    let capacity = (length as usize).saturating_sub(1);
    if wide {
        let encoded = widestring::U16String::from_str(text);
        for (slot, unit) in buffer
            .chunks_exact_mut(2)
            .zip(encoded.as_slice().iter().take(capacity))
        {
            slot.copy_from_slice(&unit.to_le_bytes());
        }
    } else {
        for (slot, byte) in buffer.iter_mut().zip(text.bytes().take(capacity)) {
            *slot = byte;
        }
    }

    Ok(())
}
