//! Signature blob encoding (ECMA-335 II.23.2), the inverse of
//! [`crate::metadata::signatures::SignatureParser`].
//!
//! Only the shapes the parser produces are encodable. [`TypeSignature::Unknown`] and the
//! element types the parser collapses into [`TypeSignature::Unsupported`] have lost their
//! payload, so only the payload-free ones (`object`, `typedref`) can be written back.

use crate::{
    builder::heaps::write_compressed_uint,
    metadata::{
        signatures::{
            CustomModifier, SignatureCallingConvention, SignatureMethod, SignatureParameter,
            TypeSignature,
        },
        tables::{CodedIndexType, TableId},
        token::Token,
        typesystem::ELEMENT_TYPE,
    },
    Error, Result,
};

/// Leading byte of a field signature
const FIELD_SIG: u8 = 0x06;
/// Calling convention flag of instance methods
const HAS_THIS: u8 = 0x20;
/// Calling convention flag of methods with an explicit `this` parameter
const EXPLICIT_THIS: u8 = 0x40;
/// Calling convention flag of generic methods
const GENERIC: u8 = 0x10;

/// Encodes `token` as a compressed `TypeDefOrRef` coded index.
fn encode_type_def_or_ref(token: Token, buffer: &mut Vec<u8>) -> Result<()> {
    let table = match token.table() {
        0x02 => TableId::TypeDef,
        0x01 => TableId::TypeRef,
        0x1B => TableId::TypeSpec,
        other => {
            return Err(malformed_error!(
                "Invalid token table 0x{:02X} for TypeDefOrRef - {}",
                other,
                token
            ))
        }
    };

    let coded = CodedIndexType::TypeDefOrRef;
    let tag = coded.tag_of(table).unwrap_or_default();
    write_compressed_uint((token.row() << coded.tag_bits()) | tag, buffer)
}

fn encode_modifiers(modifiers: &[CustomModifier], buffer: &mut Vec<u8>) -> Result<()> {
    for modifier in modifiers {
        buffer.push(if modifier.required {
            ELEMENT_TYPE::CMOD_REQD
        } else {
            ELEMENT_TYPE::CMOD_OPT
        });
        encode_type_def_or_ref(modifier.token, buffer)?;
    }
    Ok(())
}

/// Appends the encoding of `signature` to `buffer`.
///
/// # Errors
/// Returns [`Error::Unsupported`] for signatures without an encoding and
/// [`Error::Malformed`] for tokens outside `TypeDef`, `TypeRef` and `TypeSpec`.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_type(signature: &TypeSignature, buffer: &mut Vec<u8>) -> Result<()> {
    let element = match signature {
        TypeSignature::Void => ELEMENT_TYPE::VOID,
        TypeSignature::Boolean => ELEMENT_TYPE::BOOLEAN,
        TypeSignature::Char => ELEMENT_TYPE::CHAR,
        TypeSignature::I1 => ELEMENT_TYPE::I1,
        TypeSignature::U1 => ELEMENT_TYPE::U1,
        TypeSignature::I2 => ELEMENT_TYPE::I2,
        TypeSignature::U2 => ELEMENT_TYPE::U2,
        TypeSignature::I4 => ELEMENT_TYPE::I4,
        TypeSignature::U4 => ELEMENT_TYPE::U4,
        TypeSignature::I8 => ELEMENT_TYPE::I8,
        TypeSignature::U8 => ELEMENT_TYPE::U8,
        TypeSignature::R4 => ELEMENT_TYPE::R4,
        TypeSignature::R8 => ELEMENT_TYPE::R8,
        TypeSignature::String => ELEMENT_TYPE::STRING,
        TypeSignature::I => ELEMENT_TYPE::I,
        TypeSignature::U => ELEMENT_TYPE::U,
        TypeSignature::Unsupported(
            element @ (ELEMENT_TYPE::OBJECT | ELEMENT_TYPE::TYPEDBYREF),
        ) => *element,
        TypeSignature::Ptr(pointer) => {
            buffer.push(ELEMENT_TYPE::PTR);
            encode_modifiers(&pointer.modifiers, buffer)?;
            return encode_type(&pointer.base, buffer);
        }
        TypeSignature::ByRef(base) => {
            buffer.push(ELEMENT_TYPE::BYREF);
            return encode_type(base, buffer);
        }
        TypeSignature::Pinned(base) => {
            buffer.push(ELEMENT_TYPE::PINNED);
            return encode_type(base, buffer);
        }
        TypeSignature::ValueType(token) => {
            buffer.push(ELEMENT_TYPE::VALUETYPE);
            return encode_type_def_or_ref(*token, buffer);
        }
        TypeSignature::Class(token) => {
            buffer.push(ELEMENT_TYPE::CLASS);
            return encode_type_def_or_ref(*token, buffer);
        }
        TypeSignature::Array(array) => {
            buffer.push(ELEMENT_TYPE::ARRAY);
            encode_type(&array.base, buffer)?;
            write_compressed_uint(array.rank, buffer)?;

            let sizes: Vec<u32> = array
                .dimensions
                .iter()
                .map_while(|dimension| dimension.size)
                .collect();
            write_compressed_uint(sizes.len() as u32, buffer)?;
            for size in sizes {
                write_compressed_uint(size, buffer)?;
            }

            let lower_bounds: Vec<u32> = array
                .dimensions
                .iter()
                .map_while(|dimension| dimension.lower_bound)
                .collect();
            write_compressed_uint(lower_bounds.len() as u32, buffer)?;
            for bound in lower_bounds {
                write_compressed_uint(bound, buffer)?;
            }
            return Ok(());
        }
        TypeSignature::FnPtr(method) => {
            buffer.push(ELEMENT_TYPE::FNPTR);
            return encode_method(method, buffer);
        }
        TypeSignature::Unknown | TypeSignature::Unsupported(_) => {
            return Err(Error::Unsupported(format!(
                "cannot encode signature {signature:?}"
            )))
        }
    };

    buffer.push(element);
    Ok(())
}

fn encode_parameter(parameter: &SignatureParameter, buffer: &mut Vec<u8>) -> Result<()> {
    encode_modifiers(&parameter.modifiers, buffer)?;
    if parameter.by_ref {
        buffer.push(ELEMENT_TYPE::BYREF);
    }
    encode_type(&parameter.base, buffer)
}

/// Appends a method signature (`MethodDefSig`, `MethodRefSig` or the signature of a
/// function pointer) to `buffer`.
///
/// # Errors
/// See [`encode_type`].
#[allow(clippy::cast_possible_truncation)]
pub fn encode_method(signature: &SignatureMethod, buffer: &mut Vec<u8>) -> Result<()> {
    let mut convention = match signature.calling_convention {
        SignatureCallingConvention::Default => 0x00,
        SignatureCallingConvention::C => 0x01,
        SignatureCallingConvention::StdCall => 0x02,
        SignatureCallingConvention::ThisCall => 0x03,
        SignatureCallingConvention::FastCall => 0x04,
        SignatureCallingConvention::VarArg => 0x05,
    };
    if signature.has_this {
        convention |= HAS_THIS;
    }
    if signature.explicit_this {
        convention |= EXPLICIT_THIS;
    }
    if signature.param_count_generic > 0 {
        convention |= GENERIC;
    }
    buffer.push(convention);

    if signature.param_count_generic > 0 {
        write_compressed_uint(signature.param_count_generic, buffer)?;
    }
    write_compressed_uint(signature.params.len() as u32, buffer)?;
    encode_parameter(&signature.return_type, buffer)?;
    for parameter in &signature.params {
        encode_parameter(parameter, buffer)?;
    }

    Ok(())
}

/// Encodes a field signature.
///
/// # Errors
/// See [`encode_type`].
pub fn encode_field(signature: &TypeSignature) -> Result<Vec<u8>> {
    let mut buffer = vec![FIELD_SIG];
    encode_type(signature, &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signatures::{
        parse_field_signature, parse_method_signature, ArrayDimensions, SignatureArray,
        SignaturePointer,
    };

    #[test]
    fn fields() {
        assert_eq!(encode_field(&TypeSignature::I4).unwrap(), [0x06, 0x08]);

        let pointer = TypeSignature::Ptr(SignaturePointer {
            modifiers: vec![CustomModifier {
                required: false,
                token: TableId::TypeRef.token(3),
            }],
            base: Box::new(TypeSignature::ValueType(TableId::TypeDef.token(2))),
        });
        let encoded = encode_field(&pointer).unwrap();
        assert_eq!(encoded, [0x06, 0x0F, 0x20, 0x0D, 0x11, 0x08]);
        assert_eq!(parse_field_signature(&encoded).unwrap().base, pointer);

        let array = TypeSignature::Array(SignatureArray {
            base: Box::new(TypeSignature::Char),
            rank: 1,
            dimensions: vec![ArrayDimensions {
                size: Some(32),
                lower_bound: None,
            }],
        });
        assert_eq!(
            encode_field(&array).unwrap(),
            [0x06, 0x14, 0x03, 0x01, 0x01, 0x20, 0x00]
        );
    }

    #[test]
    fn methods() {
        let method = SignatureMethod {
            has_this: true,
            return_type: SignatureParameter {
                base: TypeSignature::I4,
                ..SignatureParameter::default()
            },
            params: vec![SignatureParameter {
                base: TypeSignature::Ptr(SignaturePointer {
                    modifiers: Vec::new(),
                    base: Box::new(TypeSignature::Void),
                }),
                ..SignatureParameter::default()
            }],
            ..SignatureMethod::default()
        };

        let mut buffer = Vec::new();
        encode_method(&method, &mut buffer).unwrap();
        assert_eq!(buffer, [0x20, 0x01, 0x08, 0x0F, 0x01]);
        assert_eq!(parse_method_signature(&buffer).unwrap(), method);
    }

    #[test]
    fn unencodable() {
        let mut buffer = Vec::new();
        assert!(matches!(
            encode_type(&TypeSignature::Unknown, &mut buffer),
            Err(Error::Unsupported(_))
        ));
        assert!(encode_type(&TypeSignature::Unsupported(ELEMENT_TYPE::SZARRAY), &mut buffer).is_err());
        assert!(encode_type(&TypeSignature::Class(TableId::Field.token(1)), &mut buffer).is_err());
        encode_type(&TypeSignature::Unsupported(ELEMENT_TYPE::OBJECT), &mut buffer).unwrap();
    }
}
