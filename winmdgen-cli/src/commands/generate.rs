use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use winmdgen::generator::{DirectorySink, Generator, GeneratorOptions, ERROR_LOG};

use crate::{app::GlobalOptions, commands::common::load_view, output::print_output};

/// Switches of the `generate` subcommand.
pub struct GenerateFlags {
    pub parallel: bool,
    pub apis: bool,
    pub com: bool,
}

#[derive(Debug, Serialize)]
struct GenerateOutput {
    output: String,
    emitted: usize,
    skipped: usize,
    failed: usize,
    seconds: f64,
}

pub fn run(
    path: &Path,
    output: &Path,
    docs: Option<&Path>,
    flags: GenerateFlags,
    opts: &GlobalOptions,
) -> anyhow::Result<()> {
    let view = load_view(path)?;

    let mut options = GeneratorOptions::default()
        .output_dir(output)
        .parallel(flags.parallel)
        .emit_apis(flags.apis)
        .emit_com(flags.com);
    if let Some(docs) = docs {
        options = options.docs(docs);
    }

    let mut generator = Generator::new(&view, options)
        .with_context(|| "failed to load the documentation store")?;
    generator.add_input(path)?;

    let mut sink = DirectorySink::new(output);
    let summary = generator
        .run(&mut sink)
        .with_context(|| format!("failed to write output: {}", output.display()))?;

    let result = GenerateOutput {
        output: output.display().to_string(),
        emitted: summary.emitted,
        skipped: summary.skipped,
        failed: summary.failed,
        seconds: summary.elapsed.as_secs_f64(),
    };

    print_output(&result, opts, |out| {
        println!("Output:   {}", out.output);
        println!("Emitted:  {}", out.emitted);
        println!("Skipped:  {}", out.skipped);
        println!("Failed:   {}", out.failed);
        if out.failed > 0 {
            println!("\nSee {}/{ERROR_LOG} for details.", out.output);
        }
    })
}
