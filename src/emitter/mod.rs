//! Emission of AutoHotkey v2 scripts from decoded metadata.
//!
//! Emission runs in two steps. [`classify`] decides for every TypeDef whether it gets a
//! file of its own, and [`EmissionUnit::build`] collects what that file needs: the
//! computed layout, enum members, constants and method contracts, and the other units it
//! includes. [`ScriptWriter`] then renders a unit as text, pulling doc comments from an
//! optional [`ApiDocs`] store.
//!
//! # Key Components
//!
//! - [`classify`], [`Classification`], [`UnitKind`]: which types are emitted, and as what
//! - [`EmissionUnit`], [`EmitterKind`]: one generated file and its contents
//! - [`ScriptWriter`]: renders units as `.ahk` source
//! - [`ApiDocs`], [`ApiDetails`]: the documentation store
//!
//! # Examples
//!
//! ```rust,no_run
//! use winmdgen::{
//!     emitter::{classify, ApiDocs, Classification, EmissionUnit, ScriptWriter},
//!     metadata::typesystem::{TypeDecoder, TypeRegistry},
//!     MetadataView,
//! };
//! use std::path::Path;
//!
//! let view = MetadataView::from_file(Path::new("Windows.Win32.winmd"))?;
//! let metadata = view.metadata();
//! let registry = TypeRegistry::new();
//! let mut decoder = TypeDecoder::new(metadata, &registry);
//! let docs = ApiDocs::new();
//! let writer = ScriptWriter::new(&docs, metadata.version());
//!
//! let rid = metadata
//!     .find_typedef("Windows.Win32.Foundation", "RECT")
//!     .expect("RECT is defined");
//! if let Classification::Emit(kind) = classify(&mut decoder, rid)? {
//!     let unit = EmissionUnit::build(&mut decoder, rid, kind)?;
//!     println!("{}:\n{}", unit.relative_path(), writer.render(&unit)?);
//! }
//! # Ok::<(), winmdgen::Error>(())
//! ```

mod docs;
mod script;
mod unit;

pub use docs::{ApiDetails, ApiDocs};
pub use script::{class_name, identifier, ScriptWriter};
pub use unit::{
    classify, ApiModule, Classification, ComUnit, ConstantMember, EmissionUnit, EmitterKind,
    EnumUnit, HandleUnit, TypeName, UnitKind, API_CONTAINER,
};
