//! # winmdgen Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the winmdgen library. Import this module to get quick access to the essential
//! types for reading metadata, computing layouts and generating scripts.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all winmdgen operations
pub use crate::Error;

/// The result type used throughout winmdgen
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Owning handle over a metadata image, and the borrowed view it exposes
pub use crate::metadata::view::{Metadata, MetadataView};

/// Low-level file parsing utilities
pub use crate::{File, Parser};

/// The batch driver and its configuration
pub use crate::generator::{
    DirectorySink, Generator, GeneratorOptions, MemorySink, OutputSink, RunSummary,
};

// ================================================================================================
// Metadata System - Core Types
// ================================================================================================

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Metadata root constants
pub use crate::metadata::root::{Root, CIL_HEADER_MAGIC};

/// Main headers
pub use crate::metadata::cor20header::Cor20Header;

/// Metadata heaps and the tables header
pub use crate::metadata::streams::{Blob, Guid, StreamHeader, Strings, TablesHeader};

// ================================================================================================
// Type System
// ================================================================================================

/// Semantic types, layouts and the layout registry
pub use crate::metadata::typesystem::{
    Bitfield, LayoutFlags, LayoutKind, MemberFlags, PrimitiveKind, StructLayout, StructMember,
    TypeDecoder, TypeDescriptor, TypeRegistry, TypeResolver,
};

/// Constant values
pub use crate::metadata::constants::ConstantValue;

/// Known custom attributes
pub use crate::metadata::customattributes::KnownAttribute;

// ================================================================================================
// Method Contracts
// ================================================================================================

/// Marshaling contracts of imports and COM methods
pub use crate::metadata::method::{
    CallingConvention, CharSet, ComInterface, EntryPoint, MethodContract, ParamFlags,
    ParameterContract,
};

// ================================================================================================
// Raw Metadata Table Types
// ================================================================================================

/// Raw table rows consumed by the type model
pub use crate::metadata::tables::{
    ClassLayoutRaw, ConstantRaw, CustomAttributeRaw, FieldLayoutRaw, FieldRaw, ImplMapRaw,
    InterfaceImplRaw, MemberRefRaw, MethodDefRaw, ModuleRaw, ModuleRefRaw, NestedClassRaw,
    ParamRaw, TypeDefRaw, TypeRefRaw, TypeSpecRaw,
};

/// Common attribute flags for metadata tables
pub use crate::metadata::tables::{FieldAttributes, ParamAttributes, TypeAttributes};

/// Metadata table identifiers and coded indices
pub use crate::metadata::tables::{CodedIndex, CodedIndexType, TableId};

// ================================================================================================
// Signatures
// ================================================================================================

/// Signature types and parsers
pub use crate::metadata::signatures::{
    parse_field_signature, parse_method_signature, parse_type_spec_signature, SignatureField,
    SignatureMethod, SignatureParameter, SignatureTypeSpec, TypeSignature,
};

// ================================================================================================
// Emission and Runtime Access
// ================================================================================================

/// Emission units and the script writer
pub use crate::emitter::{
    classify, ApiDocs, Classification, EmissionUnit, EmitterKind, ScriptWriter, UnitKind,
};

/// Accessors over raw struct memory
pub use crate::runtime::{ArrayView, StructView, Value};

/// Synthetic metadata images
pub use crate::builder::MetadataBuilder;
