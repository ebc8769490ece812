//! Metadata reading and the type model built on top of it.
//!
//! This module contains everything between the raw bytes of a Windows metadata image and
//! the semantic model the emitter consumes: the physical layer (CLR header, metadata root,
//! streams and tables), the one-shot indices over the tables, the signature and attribute
//! decoders, and the type system, method contracts and constants derived from them.
//!
//! # Key Components
//!
//! - [`view`] - [`crate::MetadataView`], the owning handle over one image, and the borrowed [`view::Metadata`]
//! - [`tables`] - Typed raw rows of the tables the generator consumes
//! - [`signatures`] - Field, method and type-spec signature parsing
//! - [`customattributes`] - Positional attribute decoding and the closed set of known attributes
//! - [`typesystem`] - Type descriptors, classification, struct layout and the layout registry
//! - [`method`] - Marshaling contracts of imports and COM methods
//! - [`constants`] - Literal values of constant fields
//!
//! # Examples
//!
//! ```rust,no_run
//! use winmdgen::MetadataView;
//! use std::path::Path;
//!
//! let view = MetadataView::from_file(Path::new("Windows.Win32.winmd"))?;
//! let metadata = view.metadata();
//! println!("{} ({} types)", metadata.module_name()?, metadata.type_count());
//! # Ok::<(), winmdgen::Error>(())
//! ```

/// Literal values of constant fields and enum members
pub mod constants;
/// Implementation of the Header of CIL
pub mod cor20header;
/// Implementation of custom attribute parsing and the known attribute set
pub mod customattributes;
/// Lookup indices over the metadata tables
pub mod index;
/// Marshaling contracts of callable members
pub mod method;
/// Implementation of the root metadata structure
pub mod root;
/// Implementation of method and type signatures
pub mod signatures;
/// Implementation of all metadata streams (tables, heaps, etc.)
pub mod streams;
/// Implementation of the metadata tables
pub mod tables;
/// Commonly used metadata token type
pub mod token;
/// The type model: descriptors, classification and struct layout
pub mod typesystem;
/// Owned and borrowed views over a metadata image
pub mod view;
