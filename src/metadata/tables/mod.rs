//! # ECMA-335 Metadata Tables
//!
//! Raw row types for the tables that Windows metadata populates, plus the shared
//! [`types`] building blocks. Each row type implements [`RowReadable`] so it can be viewed
//! through a [`MetadataTable`], and [`RowWritable`] so the [`crate::builder`] can emit it.
//!
//! Tables that Windows metadata never fills (events, properties, generics, security,
//! debugging) have no row type here; their row sizes are still known to [`TableInfo`] so
//! a tables stream that contains them can be walked.

/// Shared table infrastructure: ids, coded indices, row sizes and typed views
pub mod types;
pub use types::*;

/// The '`AssemblyRef`' table
pub mod assemblyref;
/// The '`ClassLayout`' table
pub mod classlayout;
/// The '`Constant`' table
pub mod constant;
/// The '`CustomAttribute`' table
pub mod customattribute;
/// The '`Field`' table
pub mod field;
/// The '`FieldLayout`' table
pub mod fieldlayout;
/// The '`ImplMap`' table
pub mod implmap;
/// The '`InterfaceImpl`' table
pub mod interfaceimpl;
/// The '`MemberRef`' table
pub mod memberref;
/// The '`MethodDef`' table
pub mod methoddef;
/// The '`Module`' table
pub mod module;
/// The '`ModuleRef`' table
pub mod moduleref;
/// The '`NestedClass`' table
pub mod nestedclass;
/// The '`Param`' table
pub mod param;
/// The '`TypeDef`' table
pub mod typedef;
/// The '`TypeRef`' table
pub mod typeref;
/// The '`TypeSpec`' table
pub mod typespec;

pub use assemblyref::AssemblyRefRaw;
pub use classlayout::ClassLayoutRaw;
pub use constant::ConstantRaw;
pub use customattribute::CustomAttributeRaw;
pub use field::{FieldAttributes, FieldRaw};
pub use fieldlayout::FieldLayoutRaw;
pub use implmap::{ImplMapRaw, PInvokeAttributes};
pub use interfaceimpl::InterfaceImplRaw;
pub use memberref::MemberRefRaw;
pub use methoddef::{MethodAttributes, MethodDefRaw, MethodImplAttributes};
pub use module::ModuleRaw;
pub use moduleref::ModuleRefRaw;
pub use nestedclass::NestedClassRaw;
pub use param::{ParamAttributes, ParamRaw};
pub use typedef::{TypeAttributes, TypeDefRaw};
pub use typeref::TypeRefRaw;
pub use typespec::TypeSpecRaw;
