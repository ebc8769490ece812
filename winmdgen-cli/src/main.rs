mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .expect("failed to set Ctrl+C handler");

    let cli = Cli::parse();

    // Show winmdgen info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("winmdgen", level)
            .filter_module("winmdgen_cli", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Generate {
            path,
            output,
            docs,
            parallel,
            no_apis,
            no_com,
        } => commands::generate::run(
            path,
            output,
            docs.as_deref(),
            commands::generate::GenerateFlags {
                parallel: *parallel,
                apis: !*no_apis,
                com: !*no_com,
            },
            &cli.global,
        ),
        Command::Layout { path, name } => commands::layout::run(path, name, &cli.global),
        Command::Info { path } => commands::info::run(path, &cli.global),
    }
}
