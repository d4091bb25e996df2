//! wordtable - Word table question converter
//!
//! A CLI tool for importing Word documents in the question table layout
//! as Moodle Question XML and exporting Question XML back to Word.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![allow(clippy::module_name_repetitions)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use wordtable::config::{ConverterConfig, CONFIG_FILE};
use wordtable::package::DocumentPackage;
use wordtable::{pipeline, templates, walker, ConversionContext, ConversionError};

/// Main entry point for the wordtable CLI application
fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

/// Run the CLI application
fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    match cli.command {
        Commands::Import {
            input,
            output,
            images,
            in_place,
        } => {
            let mut config = load_config(cli.config.as_deref(), cli.debug)?;
            if let Some(mode) = images {
                config.image_handling = mode.into();
            }
            handle_import_command(&input, output, in_place, &config, cli.verbose || cli.debug)?;
        }

        Commands::Export {
            input,
            output,
            template,
        } => {
            let mut config = load_config(cli.config.as_deref(), cli.debug)?;
            if template.is_some() {
                config.template_path = template;
            }
            handle_export_command(&input, output, &config, cli.verbose || cli.debug)?;
        }

        Commands::Labels { language } => {
            let mut config = load_config(cli.config.as_deref(), cli.debug)?;
            if let Some(language) = language {
                config.language = language;
            }
            handle_labels_command(&config)?;
        }

        Commands::InitConfig { path, force } => {
            handle_init_config_command(&path, force)?;
        }

        Commands::ListTemplates => {
            handle_list_templates_command();
        }
    }

    Ok(())
}

/// Initialize logging: `--verbose` shows run summaries, `--debug` stage detail
fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Load the configuration named on the command line, or ./wordtable.toml
fn load_config(path: Option<&Path>, debug: bool) -> Result<ConverterConfig> {
    let mut config = match path {
        Some(path) => ConverterConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => ConverterConfig::load_or_default(CONFIG_FILE)
            .with_context(|| format!("Failed to load configuration {}", CONFIG_FILE))?,
    };
    config.debug |= debug;
    Ok(config)
}

fn context_for(config: &ConverterConfig) -> Result<ConversionContext> {
    ConversionContext::from_config(config).context("Failed to prepare the conversion")
}

/// Turn a conversion error into a one-line message, with detail when verbose
fn conversion_failure(path: &Path, err: &ConversionError, verbose: bool) -> anyhow::Error {
    if verbose {
        anyhow::anyhow!("{}: {} ({})", path.display(), err.user_message(), err.debug_detail())
    } else {
        anyhow::anyhow!("{}: {}", path.display(), err.user_message())
    }
}

/// Handle the import command
fn handle_import_command(
    input: &Path,
    output: Option<PathBuf>,
    in_place: bool,
    config: &ConverterConfig,
    verbose: bool,
) -> Result<()> {
    let ctx = context_for(config)?;

    if input.is_file() {
        let bytes =
            std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
        let name = file_name(input);
        if in_place {
            let package = pipeline::import_in_place(&name, &bytes, &ctx)
                .map_err(|e| conversion_failure(input, &e, verbose))?;
            write_output(input, &package.bytes)?;
            println!("✓ Replaced: {}", input.display());
            return Ok(());
        }
        let quiz = wordtable::import_document(&name, &bytes, &ctx)
            .map_err(|e| conversion_failure(input, &e, verbose))?;
        let output = output.unwrap_or_else(|| input.with_extension("xml"));
        write_output(&output, quiz.as_bytes())?;
        println!("✓ Successfully wrote: {}", output.display());
        return Ok(());
    }

    let documents = walker::find_documents(input)
        .with_context(|| format!("Failed to scan {}", input.display()))?;
    if documents.is_empty() {
        anyhow::bail!("No Word documents found in {}", input.display());
    }
    println!("Importing {} documents from {}", documents.len(), input.display());

    let out_dir = output.unwrap_or_else(|| input.to_path_buf());
    let mut failures = 0;
    for outcome in pipeline::import_batch(&documents, &ctx) {
        match outcome.result {
            Ok(quiz) if in_place => {
                let package = DocumentPackage::smuggle(&file_name(&outcome.source), &quiz)
                    .with_context(|| format!("Failed to package {}", outcome.source.display()))?;
                write_output(&outcome.source, &package.bytes)?;
                println!("✓ Replaced: {}", outcome.source.display());
            }
            Ok(quiz) => {
                let relative = outcome.source.strip_prefix(input).unwrap_or(&outcome.source);
                let target = out_dir.join(relative).with_extension("xml");
                write_output(&target, quiz.as_bytes())?;
                println!("✓ {}", target.display());
            }
            Err(e) => {
                failures += 1;
                eprintln!("✗ {}", conversion_failure(&outcome.source, &e, verbose));
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} documents failed to import", failures, documents.len());
    }
    Ok(())
}

/// Handle the export command
fn handle_export_command(
    input: &Path,
    output: Option<PathBuf>,
    config: &ConverterConfig,
    verbose: bool,
) -> Result<()> {
    let ctx = context_for(config)?;
    let xml = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let document = wordtable::export_questions(&file_name(input), &xml, &ctx)
        .map_err(|e| conversion_failure(input, &e, verbose))?;

    let output = output.unwrap_or_else(|| input.with_file_name(&document.file_name));
    write_output(&output, &document.bytes)?;
    println!("✓ Successfully wrote: {}", output.display());
    Ok(())
}

/// Handle the labels command
fn handle_labels_command(config: &ConverterConfig) -> Result<()> {
    let ctx = context_for(config)?;
    println!("{}", ctx.labels.to_xml());
    Ok(())
}

/// Handle the init-config command
fn handle_init_config_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite",
            path.display()
        );
    }
    ConverterConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✓ Created {}", path.display());
    Ok(())
}

/// Handle the list-templates command
fn handle_list_templates_command() {
    println!("Available templates:\n");
    for template in templates::get_all_templates() {
        println!("  {:<12} {}", template.id, template.description);
    }
    println!("\nUse a custom template with: wordtable export FILE --template PATH");
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}
