use crate::metadata::token::Token;

/// A parsed type in a field, method or type-spec signature
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TypeSignature {
    #[default]
    /// Not defined
    Unknown,
    /// void
    Void,
    /// bool
    Boolean,
    /// char
    Char,
    /// signed 8bit integer
    I1,
    /// unsigned 8bit integer
    U1,
    /// signed 16bit integer
    I2,
    /// unsigned 16bit integer
    U2,
    /// signed 32bit integer
    I4,
    /// unsigned 32bit integer
    U4,
    /// signed 64bit integer
    I8,
    /// unsigned 64bit integer
    U8,
    /// 32bit floating-point
    R4,
    /// 64bit floating-point
    R8,
    /// System.String
    String,
    /// signed integer, sized to executing platform
    I,
    /// unsigned integer, sized to executing platform
    U,
    /// A pointer to a type
    Ptr(SignaturePointer),
    /// Type by reference
    ByRef(Box<TypeSignature>),
    /// Value type, `TypeDefOrRefOrSpecEncoded`
    ValueType(Token),
    /// Class or interface, `TypeDefOrRefOrSpecEncoded`
    Class(Token),
    /// Array with an explicit shape
    Array(SignatureArray),
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
    /// A pinned type
    Pinned(Box<TypeSignature>),
    /// Element type this crate does not model (generic, single dimension array, object, ...),
    /// carrying the raw element type byte
    Unsupported(u8),
}

/// Size and lower bound of one array dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayDimensions {
    /// Number of elements, if declared
    pub size: Option<u32>,
    /// Index of the first element, if declared
    pub lower_bound: Option<u32>,
}

/// An array with an explicit `ArrayShape` (II.23.2.13)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureArray {
    /// The element type
    pub base: Box<TypeSignature>,
    /// Number of dimensions
    pub rank: u32,
    /// Declared dimensions, may be fewer than `rank`
    pub dimensions: Vec<ArrayDimensions>,
}

impl SignatureArray {
    /// Total element count of a fixed-size array, `None` if any declared dimension has no size.
    ///
    /// Windows metadata encodes `T[N]` as a rank 1 array with one size.
    #[must_use]
    pub fn fixed_length(&self) -> Option<u32> {
        if self.dimensions.is_empty() {
            return None;
        }

        self.dimensions
            .iter()
            .try_fold(1u32, |total, dimension| total.checked_mul(dimension.size?))
    }
}

/// A pointer to a type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignaturePointer {
    /// Custom modifiers - `TypeDefOrRefOrSpecEncoded`
    pub modifiers: Vec<CustomModifier>,
    /// The type pointed to
    pub base: Box<TypeSignature>,
}

/// A `CMOD_REQD` or `CMOD_OPT` modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomModifier {
    /// `true` for `CMOD_REQD`
    pub required: bool,
    /// The modifier type, e.g. `IsConst`
    pub token: Token,
}

/// Parameter or return type with its custom modifiers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureParameter {
    /// Custom modifiers of the parameter
    pub modifiers: Vec<CustomModifier>,
    /// Parameter is passed by reference
    pub by_ref: bool,
    /// The type of the parameter
    pub base: TypeSignature,
}

/// Unmanaged calling convention encoded in a method signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureCallingConvention {
    /// Managed default, used by every P/Invoke declaration
    #[default]
    Default,
    /// `__cdecl`
    C,
    /// `__stdcall`
    StdCall,
    /// `__thiscall`
    ThisCall,
    /// `__fastcall`
    FastCall,
    /// Variable arguments
    VarArg,
}

/// Method signature (II.23.2.1)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureMethod {
    /// Instance method, `this` is passed implicitly
    pub has_this: bool,
    /// `this` appears in the parameter list
    pub explicit_this: bool,
    /// Calling convention bits
    pub calling_convention: SignatureCallingConvention,
    /// Number of generic parameters
    pub param_count_generic: u32,
    /// The return type
    pub return_type: SignatureParameter,
    /// The parameters in declaration order
    pub params: Vec<SignatureParameter>,
}

/// Field signature (II.23.2.4)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureField {
    /// Custom modifiers of the field
    pub modifiers: Vec<CustomModifier>,
    /// The field type
    pub base: TypeSignature,
}

/// Type specification signature (II.23.2.14)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureTypeSpec {
    /// Signature of this type
    pub base: TypeSignature,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_length() {
        let array = SignatureArray {
            base: Box::new(TypeSignature::U2),
            rank: 1,
            dimensions: vec![ArrayDimensions {
                size: Some(260),
                lower_bound: Some(0),
            }],
        };
        assert_eq!(array.fixed_length(), Some(260));

        let unsized_array = SignatureArray {
            base: Box::new(TypeSignature::U2),
            rank: 2,
            dimensions: vec![
                ArrayDimensions {
                    size: Some(4),
                    lower_bound: None,
                },
                ArrayDimensions::default(),
            ],
        };
        assert_eq!(unsized_array.fixed_length(), None);
        assert_eq!(SignatureArray::default().fixed_length(), None);
    }
}
