//! The batch driver.
//!
//! A [`Generator`] visits every TypeDef of one metadata image in table order, classifies
//! it, builds its [`EmissionUnit`] and renders it with the [`ScriptWriter`]. A type that
//! fails to build is logged, recorded in `errors.txt` and skipped; the run itself only
//! fails if the output cannot be written. Finally a `manifest.xml` records the inputs the
//! run consumed.
//!
//! # Examples
//!
//! ```rust,no_run
//! use winmdgen::{
//!     generator::{DirectorySink, Generator, GeneratorOptions},
//!     MetadataView,
//! };
//! use std::path::Path;
//!
//! let path = Path::new("Windows.Win32.winmd");
//! let view = MetadataView::from_file(path)?;
//! let options = GeneratorOptions::default().output_dir("out").parallel(true);
//!
//! let mut generator = Generator::new(&view, options.clone())?;
//! generator.add_input(path)?;
//! let summary = generator.run(&mut DirectorySink::new(&options.output))?;
//! println!("{} emitted, {} failed", summary.emitted, summary.failed);
//! # Ok::<(), winmdgen::Error>(())
//! ```

mod manifest;
mod options;
mod sink;

use std::{
    fmt::Write,
    path::Path,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use rayon::prelude::*;

pub use manifest::InputDigest;
pub use options::{architecture, GeneratorOptions};
pub use sink::{DirectorySink, MemorySink, OutputSink};

use crate::{
    emitter::{classify, ApiDocs, Classification, EmissionUnit, EmitterKind, ScriptWriter},
    metadata::{
        typesystem::{TypeDecoder, TypeRegistry},
        view::MetadataView,
    },
    Error, Result,
};

/// Name of the failure log written at the output root
pub const ERROR_LOG: &str = "errors.txt";

/// Name of the run manifest written at the output root
pub const MANIFEST: &str = "manifest.xml";

/// Progress is logged every this many emitted files
const PROGRESS_INTERVAL: usize = 1000;

/// Counts of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Files written
    pub emitted: usize,
    /// Types not emitted on their own or disabled by the options
    pub skipped: usize,
    /// Types that failed to build
    pub failed: usize,
    /// Wall time of the run
    pub elapsed: Duration,
}

/// What became of one TypeDef
enum Outcome {
    Emitted { path: String, contents: String },
    Skipped,
    Failed { name: String, error: Error },
}

/// Drives one metadata image through classification, unit construction and rendering
pub struct Generator<'v> {
    view: &'v MetadataView,
    options: GeneratorOptions,
    docs: ApiDocs,
    inputs: Vec<InputDigest>,
}

impl<'v> Generator<'v> {
    /// Creates a generator over `view`, loading the documentation store named by
    /// `options`.
    ///
    /// # Arguments
    ///
    /// * `view` - The metadata image to generate from
    /// * `options` - Output, filtering and parallelism settings
    ///
    /// # Errors
    /// Returns an error if the documentation store cannot be read or parsed.
    pub fn new(view: &'v MetadataView, options: GeneratorOptions) -> Result<Self> {
        let mut inputs = Vec::new();
        let docs = match &options.docs {
            Some(path) => {
                inputs.push(digest_file(path)?);
                ApiDocs::from_file(path)?
            }
            None => ApiDocs::new(),
        };

        Ok(Generator {
            view,
            options,
            docs,
            inputs,
        })
    }

    /// Replaces the documentation store.
    #[must_use]
    pub fn with_docs(mut self, docs: ApiDocs) -> Self {
        self.docs = docs;
        self
    }

    /// Records the digests of input file `path` in the manifest.
    ///
    /// # Errors
    /// Returns [`Error::FileError`] if the file cannot be read.
    pub fn add_input(&mut self, path: &Path) -> Result<()> {
        self.inputs.push(digest_file(path)?);
        Ok(())
    }

    /// The options of this generator.
    #[must_use]
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Generates every unit into `sink`, followed by the error log and the manifest.
    ///
    /// Units are written in TypeDef table order whether or not the run is parallel, so two
    /// runs over the same image produce identical files.
    ///
    /// # Arguments
    ///
    /// * `sink` - Receives every generated file, `errors.txt` and `manifest.xml`
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use winmdgen::{
    ///     generator::{DirectorySink, Generator, GeneratorOptions},
    ///     MetadataView,
    /// };
    /// use std::path::Path;
    ///
    /// let view = MetadataView::from_file(Path::new("Windows.Win32.winmd"))?;
    /// let generator = Generator::new(&view, GeneratorOptions::default().parallel(true))?;
    /// let summary = generator.run(&mut DirectorySink::new("out"))?;
    /// println!("{} emitted, {} failed", summary.emitted, summary.failed);
    /// # Ok::<(), winmdgen::Error>(())
    /// ```
    ///
    /// # Errors
    /// Returns an error only if `sink` rejects a file or the manifest cannot be built;
    /// per-type failures are counted in the [`RunSummary`] instead.
    pub fn run(&self, sink: &mut dyn OutputSink) -> Result<RunSummary> {
        let start = Instant::now();
        let metadata = self.view.metadata();
        let registry = TypeRegistry::new();
        let writer = ScriptWriter::new(&self.docs, metadata.version());
        let options = &self.options;

        let rids: Vec<u32> = (1..=metadata.type_count()).collect();
        let outcomes: Vec<Outcome> = if options.parallel {
            rids.par_iter()
                .map_init(
                    || TypeDecoder::new(metadata, &registry),
                    |decoder, rid| process(decoder, &writer, options, *rid),
                )
                .collect()
        } else {
            let mut decoder = TypeDecoder::new(metadata, &registry);
            rids.iter()
                .map(|rid| process(&mut decoder, &writer, options, *rid))
                .collect()
        };

        let mut summary = RunSummary::default();
        let mut errors = String::new();
        for outcome in outcomes {
            match outcome {
                Outcome::Emitted { path, contents } => {
                    sink.write(&path, contents.as_bytes())?;
                    summary.emitted += 1;
                    if summary.emitted % PROGRESS_INTERVAL == 0 {
                        info!("Emitted {} files", summary.emitted);
                    }
                }
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Failed { name, error } => {
                    warn!("Failed to generate {name}: {error}");
                    let _ = writeln!(errors, "{name}: {error}");
                    summary.failed += 1;
                }
            }
        }

        sink.write(ERROR_LOG, errors.as_bytes())?;
        summary.elapsed = start.elapsed();
        sink.write(MANIFEST, &manifest::render(metadata, &self.inputs, &summary)?)?;

        info!(
            "Done! Emitted {} files in {:.2} seconds",
            summary.emitted,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }
}

fn digest_file(path: &Path) -> Result<InputDigest> {
    let data = std::fs::read(path)?;
    let name = path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    );
    Ok(InputDigest::of(name, &data))
}

fn process(
    decoder: &mut TypeDecoder<'_, '_>,
    writer: &ScriptWriter<'_>,
    options: &GeneratorOptions,
    rid: u32,
) -> Outcome {
    let name = decoder
        .metadata()
        .qualified_name(rid)
        .unwrap_or_else(|_| format!("TypeDef #{rid}"));

    match build(decoder, writer, options, rid, &name) {
        Ok(Some((path, contents))) => Outcome::Emitted { path, contents },
        Ok(None) => Outcome::Skipped,
        Err(error) => Outcome::Failed { name, error },
    }
}

fn build(
    decoder: &mut TypeDecoder<'_, '_>,
    writer: &ScriptWriter<'_>,
    options: &GeneratorOptions,
    rid: u32,
    name: &str,
) -> Result<Option<(String, String)>> {
    let kind = match classify(decoder, rid)? {
        Classification::Emit(kind) => kind,
        Classification::Skip(reason) => {
            debug!("Skipping {name}: {reason}");
            return Ok(None);
        }
    };

    if !options.emits(kind) {
        debug!("Skipping {name}: {kind} output is disabled");
        return Ok(None);
    }

    let unit = EmissionUnit::build(decoder, rid, kind)?;
    let architecture = match &unit.kind {
        EmitterKind::Struct(layout) => layout.architecture,
        EmitterKind::Handle(handle) => handle.layout.architecture,
        EmitterKind::Enum(_) | EmitterKind::ApiModule(_) | EmitterKind::ComInterface(_) => None,
    };
    if !options.supports(architecture) {
        debug!("Skipping {name}: not available on the selected architecture");
        return Ok(None);
    }

    Ok(Some((unit.relative_path(), writer.render(&unit)?)))
}
