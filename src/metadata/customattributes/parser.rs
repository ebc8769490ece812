//! Positional custom attribute blob parser (ECMA-335 II.23.3).
//!
//! Fixed arguments are read in constructor parameter order using the constructor's method
//! signature. Enum-typed parameters are read with a 4-byte underlying value; every enum that
//! Windows metadata uses as an attribute argument (`Architecture`, `CallingConvention`) is
//! `int32`. Boxed (`object`) and array arguments are not supported.

use crate::{
    file::parser::Parser,
    metadata::{
        customattributes::{
            CustomAttributeArgument, CustomAttributeNamedArgument, CustomAttributeValue,
            SERIALIZATION_TYPE,
        },
        signatures::{SignatureParameter, TypeSignature},
    },
    Error, Result,
};

/// Leading `u16` of every custom attribute blob
const PROLOG: u16 = 0x0001;

/// Parse a custom attribute blob with the parameter list of its constructor.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a bad prolog or truncated data, and
/// [`crate::Error::Unsupported`] for argument shapes outside the supported set.
pub fn parse_custom_attribute_blob(
    data: &[u8],
    params: &[SignatureParameter],
) -> Result<CustomAttributeValue> {
    CustomAttributeParser::new(data).parse_custom_attribute(params)
}

/// Cursor over one custom attribute blob
pub struct CustomAttributeParser<'a> {
    parser: Parser<'a>,
}

impl<'a> CustomAttributeParser<'a> {
    /// Creates a new custom attribute parser for the provided blob data.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            parser: Parser::new(data),
        }
    }

    /// Parse the complete blob: prolog, fixed arguments, then named arguments.
    ///
    /// An empty blob is accepted as an attribute without arguments.
    ///
    /// # Errors
    /// See [`parse_custom_attribute_blob`].
    pub fn parse_custom_attribute(
        &mut self,
        params: &[SignatureParameter],
    ) -> Result<CustomAttributeValue> {
        if self.parser.is_empty() {
            return Ok(CustomAttributeValue::default());
        }

        let prolog = self.parser.read_le::<u16>()?;
        if prolog != PROLOG {
            return Err(malformed_error!(
                "Invalid custom attribute prolog - expected 0x0001, got {:#06x}",
                prolog
            ));
        }

        let mut fixed_args = Vec::with_capacity(params.len());
        for param in params {
            fixed_args.push(self.parse_fixed_argument(&param.base)?);
        }

        let mut named_args = Vec::new();
        if self.parser.remaining() >= 2 {
            let num_named = self.parser.read_le::<u16>()?;
            for _ in 0..num_named {
                named_args.push(self.parse_named_argument()?);
            }
        }

        Ok(CustomAttributeValue {
            fixed_args,
            named_args,
        })
    }

    fn parse_fixed_argument(&mut self, param: &TypeSignature) -> Result<CustomAttributeArgument> {
        let tag = match param {
            TypeSignature::Boolean => SERIALIZATION_TYPE::BOOLEAN,
            TypeSignature::Char => SERIALIZATION_TYPE::CHAR,
            TypeSignature::I1 => SERIALIZATION_TYPE::I1,
            TypeSignature::U1 => SERIALIZATION_TYPE::U1,
            TypeSignature::I2 => SERIALIZATION_TYPE::I2,
            TypeSignature::U2 => SERIALIZATION_TYPE::U2,
            TypeSignature::I4 => SERIALIZATION_TYPE::I4,
            TypeSignature::U4 => SERIALIZATION_TYPE::U4,
            TypeSignature::I8 => SERIALIZATION_TYPE::I8,
            TypeSignature::U8 => SERIALIZATION_TYPE::U8,
            TypeSignature::R4 => SERIALIZATION_TYPE::R4,
            TypeSignature::R8 => SERIALIZATION_TYPE::R8,
            TypeSignature::String => SERIALIZATION_TYPE::STRING,
            // The only class a fixed argument can name is System.Type
            TypeSignature::Class(_) => SERIALIZATION_TYPE::TYPE,
            TypeSignature::ValueType(_) => {
                let value = self.parser.read_le::<i32>()?;
                return Ok(CustomAttributeArgument::Enum(
                    None,
                    Box::new(CustomAttributeArgument::I4(value)),
                ));
            }
            other => {
                return Err(Error::Unsupported(format!(
                    "custom attribute argument of type {other:?}"
                )))
            }
        };

        self.parse_argument_by_type_tag(tag)
    }

    fn parse_named_argument(&mut self) -> Result<CustomAttributeNamedArgument> {
        let field_or_prop = self.parser.read_le::<u8>()?;
        let is_field = match field_or_prop {
            SERIALIZATION_TYPE::FIELD => true,
            SERIALIZATION_TYPE::PROPERTY => false,
            _ => {
                return Err(malformed_error!(
                    "Invalid field/property indicator: 0x{:02X}",
                    field_or_prop
                ))
            }
        };

        let type_info = self.parser.read_le::<u8>()?;
        let enum_name = if type_info == SERIALIZATION_TYPE::ENUM {
            self.parser.read_ser_string()?
        } else {
            None
        };

        let name = self
            .parser
            .read_ser_string()?
            .ok_or_else(|| malformed_error!("Named argument without a name"))?;

        let value = if type_info == SERIALIZATION_TYPE::ENUM {
            CustomAttributeArgument::Enum(
                enum_name,
                Box::new(CustomAttributeArgument::I4(self.parser.read_le::<i32>()?)),
            )
        } else {
            self.parse_argument_by_type_tag(type_info)?
        };

        Ok(CustomAttributeNamedArgument {
            is_field,
            name,
            value,
        })
    }

    fn parse_argument_by_type_tag(&mut self, type_tag: u8) -> Result<CustomAttributeArgument> {
        let argument = match type_tag {
            SERIALIZATION_TYPE::BOOLEAN => {
                CustomAttributeArgument::Bool(self.parser.read_le::<u8>()? != 0)
            }
            SERIALIZATION_TYPE::CHAR => CustomAttributeArgument::Char(self.parser.read_le()?),
            SERIALIZATION_TYPE::I1 => CustomAttributeArgument::I1(self.parser.read_le()?),
            SERIALIZATION_TYPE::U1 => CustomAttributeArgument::U1(self.parser.read_le()?),
            SERIALIZATION_TYPE::I2 => CustomAttributeArgument::I2(self.parser.read_le()?),
            SERIALIZATION_TYPE::U2 => CustomAttributeArgument::U2(self.parser.read_le()?),
            SERIALIZATION_TYPE::I4 => CustomAttributeArgument::I4(self.parser.read_le()?),
            SERIALIZATION_TYPE::U4 => CustomAttributeArgument::U4(self.parser.read_le()?),
            SERIALIZATION_TYPE::I8 => CustomAttributeArgument::I8(self.parser.read_le()?),
            SERIALIZATION_TYPE::U8 => CustomAttributeArgument::U8(self.parser.read_le()?),
            SERIALIZATION_TYPE::R4 => CustomAttributeArgument::R4(self.parser.read_le()?),
            SERIALIZATION_TYPE::R8 => CustomAttributeArgument::R8(self.parser.read_le()?),
            SERIALIZATION_TYPE::STRING => match self.parser.read_ser_string()? {
                Some(value) => CustomAttributeArgument::String(value),
                None => CustomAttributeArgument::Null,
            },
            SERIALIZATION_TYPE::TYPE => match self.parser.read_ser_string()? {
                Some(value) => CustomAttributeArgument::Type(value),
                None => CustomAttributeArgument::Null,
            },
            SERIALIZATION_TYPE::SZARRAY | SERIALIZATION_TYPE::TAGGED_OBJECT => {
                return Err(Error::Unsupported(format!(
                    "custom attribute argument with serialization type 0x{type_tag:02X}"
                )))
            }
            _ => {
                return Err(malformed_error!(
                    "Invalid serialization type: 0x{:02X}",
                    type_tag
                ))
            }
        };

        Ok(argument)
    }
}
