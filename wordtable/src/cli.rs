//! Command-line interface definitions for wordtable

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use wordtable::params::ImageHandling;

/// Image handling selected on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ImageMode {
    /// Inline images as data: URIs
    Embedded,
    /// Reference images as @@PLUGINFILE@@ files attached to each question
    Referenced,
}

impl From<ImageMode> for ImageHandling {
    fn from(mode: ImageMode) -> Self {
        match mode {
            ImageMode::Embedded => ImageHandling::Embedded,
            ImageMode::Referenced => ImageHandling::Referenced,
        }
    }
}

/// CLI structure for the wordtable application
#[derive(Parser)]
#[command(name = "wordtable")]
#[command(version)]
#[command(about = "Convert between Word question tables and Moodle Question XML", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./wordtable.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log run summaries
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log stage detail and keep intermediate files
    #[arg(long, global = true)]
    pub debug: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for wordtable
#[derive(Subcommand)]
pub enum Commands {
    /// Import a Word file, or every Word file in a directory, to Question XML
    Import {
        /// .docx file or directory
        #[arg(value_name = "FILE|DIR")]
        input: PathBuf,

        /// Output file (single input) or directory (directory input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// How images are written into the question text
        #[arg(long, value_enum)]
        images: Option<ImageMode>,

        /// Replace each Word file with a package holding its Question XML
        #[arg(long, conflicts_with = "output")]
        in_place: bool,
    },

    /// Export a Question XML file to a Word document
    Export {
        /// Question XML file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (defaults to the input name with a .doc extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Word HTML template to use instead of the built-in one
        #[arg(short, long)]
        template: Option<PathBuf>,
    },

    /// Print the label dictionary used by the transforms
    Labels {
        /// Language of the labels
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Write a default wordtable.toml
    InitConfig {
        /// Where to write the file
        #[arg(default_value = "wordtable.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// List the built-in Word HTML templates
    ListTemplates,
}
