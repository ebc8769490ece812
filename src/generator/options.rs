//! Run configuration.

use std::path::{Path, PathBuf};

use crate::emitter::UnitKind;

/// Architecture bits of `SupportedArchitectureAttribute`
pub mod architecture {
    /// 32-bit x86
    pub const X86: u32 = 1;
    /// x86-64
    pub const X64: u32 = 2;
    /// ARM64
    pub const ARM64: u32 = 4;
}

/// Settings of one generator run.
///
/// Every unit kind is emitted by default, sequentially, into `./out` for x64.
///
/// ```rust
/// use winmdgen::generator::GeneratorOptions;
///
/// let options = GeneratorOptions::default()
///     .output_dir("scripts")
///     .parallel(true)
///     .emit_com(false);
/// assert!(options.parallel);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Root directory of the generated tree
    pub output: PathBuf,
    /// XML documentation store to draw doc comments from
    pub docs: Option<PathBuf>,
    /// Build units on the rayon thread pool
    pub parallel: bool,
    /// Emit `Apis` modules
    pub emit_apis: bool,
    /// Emit COM interfaces
    pub emit_com: bool,
    /// Emit handle classes
    pub emit_handles: bool,
    /// Emit enums
    pub emit_enums: bool,
    /// Skip structs restricted to architectures outside this mask, `None` keeps all
    pub architecture: Option<u32>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            output: PathBuf::from("out"),
            docs: None,
            parallel: false,
            emit_apis: true,
            emit_com: true,
            emit_handles: true,
            emit_enums: true,
            architecture: Some(architecture::X64),
        }
    }
}

impl GeneratorOptions {
    /// Sets the output directory.
    #[must_use]
    pub fn output_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.output = path.as_ref().to_path_buf();
        self
    }

    /// Sets the documentation store.
    #[must_use]
    pub fn docs(mut self, path: impl AsRef<Path>) -> Self {
        self.docs = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables or disables parallel unit construction.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enables or disables API modules.
    #[must_use]
    pub fn emit_apis(mut self, emit: bool) -> Self {
        self.emit_apis = emit;
        self
    }

    /// Enables or disables COM interfaces.
    #[must_use]
    pub fn emit_com(mut self, emit: bool) -> Self {
        self.emit_com = emit;
        self
    }

    /// Enables or disables handle classes.
    #[must_use]
    pub fn emit_handles(mut self, emit: bool) -> Self {
        self.emit_handles = emit;
        self
    }

    /// Enables or disables enums.
    #[must_use]
    pub fn emit_enums(mut self, emit: bool) -> Self {
        self.emit_enums = emit;
        self
    }

    /// Sets the architecture filter, `None` to keep every struct.
    #[must_use]
    pub fn architecture(mut self, mask: Option<u32>) -> Self {
        self.architecture = mask;
        self
    }

    /// Returns `true` if units of `kind` are generated.
    #[must_use]
    pub fn emits(&self, kind: UnitKind) -> bool {
        match kind {
            UnitKind::Struct => true,
            UnitKind::Handle => self.emit_handles,
            UnitKind::Enum => self.emit_enums,
            UnitKind::ApiModule => self.emit_apis,
            UnitKind::ComInterface => self.emit_com,
        }
    }

    /// Returns `true` if a type restricted to architecture `mask` is generated.
    #[must_use]
    pub fn supports(&self, mask: Option<u32>) -> bool {
        match (self.architecture, mask) {
            (Some(wanted), Some(mask)) => wanted & mask != 0,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters() {
        let options = GeneratorOptions::default().emit_apis(false);
        assert!(!options.emits(UnitKind::ApiModule));
        assert!(options.emits(UnitKind::Struct));
        assert!(options.supports(None));
        assert!(options.supports(Some(architecture::X64 | architecture::ARM64)));
        assert!(!options.supports(Some(architecture::X86)));
        assert!(options.architecture(None).supports(Some(architecture::X86)));
    }
}
