use crate::{
    file::parser::Parser,
    metadata::{
        signatures::{
            ArrayDimensions, CustomModifier, SignatureArray, SignatureCallingConvention,
            SignatureField, SignatureMethod, SignatureParameter, SignaturePointer,
            SignatureTypeSpec, TypeSignature,
        },
        typesystem::ELEMENT_TYPE,
    },
    Error::RecursionLimit,
    Result,
};

/// Maximum recursion depth for signature parsing
const MAX_RECURSION_DEPTH: usize = 50;

/// Leading byte of a field signature
const FIELD_SIG: u8 = 0x06;

/// Signature parser for the field, method and type-spec signatures found in Windows metadata.
///
/// # Example
///
/// ```rust
/// use winmdgen::metadata::signatures::{SignatureParser, TypeSignature};
///
/// // static void f(int32, char*)
/// let data = &[0x00, 0x02, 0x01, 0x08, 0x0F, 0x03];
/// let mut parser = SignatureParser::new(data);
/// let sig = parser.parse_method_signature()?;
/// assert_eq!(sig.params.len(), 2);
/// assert_eq!(sig.return_type.base, TypeSignature::Void);
/// # Ok::<(), winmdgen::Error>(())
/// ```
///
/// Element types outside the supported set (generics, single dimension arrays, `object`) are
/// consumed and reported as [`TypeSignature::Unsupported`] so the remainder of a method
/// signature can still be read. A parser instance is meant for a single signature.
pub struct SignatureParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> SignatureParser<'a> {
    /// Create a new `SignatureParser` from a byte slice
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            depth: 0,
        }
    }

    fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(RecursionLimit(MAX_RECURSION_DEPTH));
        }

        let current_byte = self.parser.read_le::<u8>()?;
        let parsed = match current_byte {
            ELEMENT_TYPE::VOID => TypeSignature::Void,
            ELEMENT_TYPE::BOOLEAN => TypeSignature::Boolean,
            ELEMENT_TYPE::CHAR => TypeSignature::Char,
            ELEMENT_TYPE::I1 => TypeSignature::I1,
            ELEMENT_TYPE::U1 => TypeSignature::U1,
            ELEMENT_TYPE::I2 => TypeSignature::I2,
            ELEMENT_TYPE::U2 => TypeSignature::U2,
            ELEMENT_TYPE::I4 => TypeSignature::I4,
            ELEMENT_TYPE::U4 => TypeSignature::U4,
            ELEMENT_TYPE::I8 => TypeSignature::I8,
            ELEMENT_TYPE::U8 => TypeSignature::U8,
            ELEMENT_TYPE::R4 => TypeSignature::R4,
            ELEMENT_TYPE::R8 => TypeSignature::R8,
            ELEMENT_TYPE::STRING => TypeSignature::String,
            ELEMENT_TYPE::I => TypeSignature::I,
            ELEMENT_TYPE::U => TypeSignature::U,
            ELEMENT_TYPE::PTR => TypeSignature::Ptr(SignaturePointer {
                modifiers: self.parse_custom_mods()?,
                base: Box::new(self.parse_type()?),
            }),
            ELEMENT_TYPE::BYREF => TypeSignature::ByRef(Box::new(self.parse_type()?)),
            ELEMENT_TYPE::VALUETYPE => {
                TypeSignature::ValueType(self.parser.read_compressed_token()?)
            }
            ELEMENT_TYPE::CLASS => TypeSignature::Class(self.parser.read_compressed_token()?),
            ELEMENT_TYPE::ARRAY => {
                let elem_type = self.parse_type()?;
                let rank = self.parser.read_compressed_uint()?;

                let num_sizes = self.parser.read_compressed_uint()?;
                let mut dimensions: Vec<ArrayDimensions> =
                    Vec::with_capacity(num_sizes.min(16) as usize);
                for _ in 0..num_sizes {
                    dimensions.push(ArrayDimensions {
                        size: Some(self.parser.read_compressed_uint()?),
                        lower_bound: None,
                    });
                }

                let num_lo_bounds = self.parser.read_compressed_uint()?;
                for i in 0..num_lo_bounds {
                    let lower_bound = self.parser.read_compressed_uint()?;
                    if let Some(dimension) = dimensions.get_mut(i as usize) {
                        dimension.lower_bound = Some(lower_bound);
                    }
                }

                TypeSignature::Array(SignatureArray {
                    base: Box::new(elem_type),
                    rank,
                    dimensions,
                })
            }
            ELEMENT_TYPE::FNPTR => TypeSignature::FnPtr(Box::new(self.parse_method_signature()?)),
            ELEMENT_TYPE::PINNED => TypeSignature::Pinned(Box::new(self.parse_type()?)),
            ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                self.parser.read_compressed_token()?;
                self.depth -= 1;
                return self.parse_type();
            }
            ELEMENT_TYPE::SZARRAY => {
                self.parse_custom_mods()?;
                self.parse_type()?;
                TypeSignature::Unsupported(current_byte)
            }
            ELEMENT_TYPE::GENERICINST => {
                self.parse_type()?;
                let arg_count = self.parser.read_compressed_uint()?;
                for _ in 0..arg_count {
                    self.parse_type()?;
                }
                TypeSignature::Unsupported(current_byte)
            }
            ELEMENT_TYPE::VAR | ELEMENT_TYPE::MVAR => {
                self.parser.read_compressed_uint()?;
                TypeSignature::Unsupported(current_byte)
            }
            ELEMENT_TYPE::OBJECT | ELEMENT_TYPE::TYPEDBYREF => {
                TypeSignature::Unsupported(current_byte)
            }
            // An unknown code has no known length, so it is only skipped when it ends the blob
            _ if !self.parser.has_more_data() => TypeSignature::Unsupported(current_byte),
            _ => {
                return Err(malformed_error!(
                    "Unsupported ELEMENT_TYPE - {}",
                    current_byte
                ))
            }
        };

        self.depth -= 1;
        Ok(parsed)
    }

    fn parse_custom_mods(&mut self) -> Result<Vec<CustomModifier>> {
        let mut mods = Vec::new();

        while self.parser.has_more_data() {
            let next_byte = self.parser.peek_byte()?;
            if next_byte != ELEMENT_TYPE::CMOD_REQD && next_byte != ELEMENT_TYPE::CMOD_OPT {
                break;
            }

            self.parser.advance_by(1)?;
            mods.push(CustomModifier {
                required: next_byte == ELEMENT_TYPE::CMOD_REQD,
                token: self.parser.read_compressed_token()?,
            });
        }

        Ok(mods)
    }

    fn parse_param(&mut self) -> Result<SignatureParameter> {
        let modifiers = self.parse_custom_mods()?;

        let mut by_ref = false;
        if self.parser.peek_byte()? == ELEMENT_TYPE::BYREF {
            self.parser.advance_by(1)?;
            by_ref = true;
        }

        Ok(SignatureParameter {
            modifiers,
            by_ref,
            base: self.parse_type()?,
        })
    }

    /// Parse a method signature (II.23.2.1): `MethodDefSig`, `MethodRefSig` or the signature
    /// embedded in a function pointer.
    ///
    /// A vararg sentinel is skipped; the parameters after it are appended to `params`.
    ///
    /// # Errors
    /// Returns an error if the blob is truncated or contains an unknown element type.
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let convention_byte = self.parser.read_le::<u8>()?;

        let calling_convention = match convention_byte & 0x0F {
            0x00 => SignatureCallingConvention::Default,
            0x01 => SignatureCallingConvention::C,
            0x02 => SignatureCallingConvention::StdCall,
            0x03 => SignatureCallingConvention::ThisCall,
            0x04 => SignatureCallingConvention::FastCall,
            0x05 => SignatureCallingConvention::VarArg,
            other => {
                return Err(malformed_error!(
                    "SignatureMethod - invalid calling convention - {}",
                    other
                ))
            }
        };

        let param_count_generic = if convention_byte & 0x10 != 0 {
            self.parser.read_compressed_uint()?
        } else {
            0
        };
        let param_count = self.parser.read_compressed_uint()?;
        let return_type = self.parse_param()?;

        let mut params = Vec::with_capacity(param_count.min(64) as usize);
        for _ in 0..param_count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                self.parser.advance_by(1)?;
            }

            params.push(self.parse_param()?);
        }

        Ok(SignatureMethod {
            has_this: convention_byte & 0x20 != 0,
            explicit_this: convention_byte & 0x40 != 0,
            calling_convention,
            param_count_generic,
            return_type,
            params,
        })
    }

    /// Parse a field signature (II.23.2.4).
    ///
    /// # Errors
    /// Returns an error if the leading byte is not `FIELD` or the type cannot be parsed.
    pub fn parse_field_signature(&mut self) -> Result<SignatureField> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != FIELD_SIG {
            return Err(malformed_error!(
                "SignatureField - invalid start - {}",
                head_byte
            ));
        }

        Ok(SignatureField {
            modifiers: self.parse_custom_mods()?,
            base: self.parse_type()?,
        })
    }

    /// Parse a type specification signature (II.23.2.14).
    ///
    /// # Errors
    /// Returns an error if the type cannot be parsed.
    pub fn parse_type_spec_signature(&mut self) -> Result<SignatureTypeSpec> {
        Ok(SignatureTypeSpec {
            base: self.parse_type()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::token::Token, Error};

    #[test]
    fn field_primitives() {
        let test_cases = vec![
            (vec![0x06, 0x08], TypeSignature::I4),
            (vec![0x06, 0x09], TypeSignature::U4),
            (vec![0x06, 0x0D], TypeSignature::R8),
            (vec![0x06, 0x18], TypeSignature::I),
            (vec![0x06, 0x03], TypeSignature::Char),
        ];

        for (input, expected) in test_cases {
            let mut parser = SignatureParser::new(&input);
            assert_eq!(parser.parse_field_signature().unwrap().base, expected);
        }
    }

    #[test]
    fn field_bad_header() {
        let mut parser = SignatureParser::new(&[0x07, 0x08]);
        assert!(matches!(
            parser.parse_field_signature(),
            Err(Error::Malformed { .. })
        ));

        let mut parser = SignatureParser::new(&[0x06]);
        assert!(matches!(
            parser.parse_field_signature(),
            Err(Error::OutOfBounds)
        ));
    }

    #[test]
    fn field_modifiers() {
        // modreq(TypeRef 2) valuetype TypeDef 3
        let mut parser = SignatureParser::new(&[0x06, 0x1F, 0x09, 0x11, 0x0C]);
        let field = parser.parse_field_signature().unwrap();
        assert_eq!(
            field.modifiers,
            vec![CustomModifier {
                required: true,
                token: Token::new(0x0100_0002),
            }]
        );
        assert_eq!(field.base, TypeSignature::ValueType(Token::new(0x0200_0003)));
    }

    #[test]
    fn fixed_array() {
        // ushort[260]
        let mut parser =
            SignatureParser::new(&[0x06, 0x14, 0x07, 0x01, 0x01, 0x81, 0x04, 0x01, 0x00]);
        let TypeSignature::Array(array) = parser.parse_field_signature().unwrap().base else {
            panic!("expected an array");
        };
        assert_eq!(*array.base, TypeSignature::U2);
        assert_eq!(array.rank, 1);
        assert_eq!(array.fixed_length(), Some(260));
        assert_eq!(array.dimensions[0].lower_bound, Some(0));
    }

    #[test]
    fn pointers() {
        // void**
        let mut parser = SignatureParser::new(&[0x06, 0x0F, 0x0F, 0x01]);
        let TypeSignature::Ptr(outer) = parser.parse_field_signature().unwrap().base else {
            panic!("expected a pointer");
        };
        let TypeSignature::Ptr(inner) = *outer.base else {
            panic!("expected a pointer");
        };
        assert_eq!(*inner.base, TypeSignature::Void);
    }

    #[test]
    fn unsupported_consumed() {
        // static void f(int32[], object, int32)
        let mut parser = SignatureParser::new(&[0x00, 0x03, 0x01, 0x1D, 0x08, 0x1C, 0x08]);
        let method = parser.parse_method_signature().unwrap();
        assert_eq!(
            method.params.iter().map(|p| p.base.clone()).collect::<Vec<_>>(),
            vec![
                TypeSignature::Unsupported(0x1D),
                TypeSignature::Unsupported(0x1C),
                TypeSignature::I4,
            ]
        );
    }

    #[test]
    fn method() {
        // instance HRESULT(valuetype) f(uint32*, byref int32)
        let mut parser =
            SignatureParser::new(&[0x20, 0x02, 0x11, 0x08, 0x0F, 0x09, 0x10, 0x08]);
        let method = parser.parse_method_signature().unwrap();
        assert!(method.has_this);
        assert_eq!(method.calling_convention, SignatureCallingConvention::Default);
        assert_eq!(
            method.return_type.base,
            TypeSignature::ValueType(Token::new(0x0200_0002))
        );
        assert_eq!(method.params.len(), 2);
        assert!(method.params[1].by_ref);
        assert_eq!(method.params[1].base, TypeSignature::I4);
    }

    #[test]
    fn function_pointer() {
        // delegate* unmanaged[Stdcall]<int32, void>
        let mut parser = SignatureParser::new(&[0x06, 0x1B, 0x02, 0x01, 0x01, 0x08]);
        let TypeSignature::FnPtr(method) = parser.parse_field_signature().unwrap().base else {
            panic!("expected a function pointer");
        };
        assert_eq!(method.calling_convention, SignatureCallingConvention::StdCall);
        assert_eq!(method.params[0].base, TypeSignature::I4);
    }

    #[test]
    fn recursion_limit() {
        let mut data = vec![0x06];
        data.extend(std::iter::repeat(0x0F).take(MAX_RECURSION_DEPTH + 1));
        data.push(0x01);

        let mut parser = SignatureParser::new(&data);
        assert!(matches!(
            parser.parse_field_signature(),
            Err(Error::RecursionLimit(_))
        ));
    }

    #[test]
    fn unknown_element() {
        let mut parser = SignatureParser::new(&[0x06, 0x55]);
        assert_eq!(
            parser.parse_field_signature().unwrap().base,
            TypeSignature::Unsupported(0x55)
        );

        let mut parser = SignatureParser::new(&[0x06, 0x0F, 0x55]);
        let TypeSignature::Ptr(pointer) = parser.parse_field_signature().unwrap().base else {
            panic!("expected a pointer");
        };
        assert_eq!(*pointer.base, TypeSignature::Unsupported(0x55));

        // static void f(?, int32): the parameters after the unknown code cannot be found
        let mut parser = SignatureParser::new(&[0x00, 0x02, 0x01, 0x55, 0x08]);
        assert!(matches!(
            parser.parse_method_signature(),
            Err(Error::Malformed { .. })
        ));
    }
}
