//! PDF Slim CLI tool
//!
//! A command-line tool for merging plotter PDFs and shrinking their path data.

use anyhow::{bail, Context, Result};
use clap::Parser;
use glob::glob;
use std::path::PathBuf;

use pdf_slim::pages::{split_input_argument, PageSelection};
use pdf_slim::pdf::{extract_metadata, merge_pdfs, next_output_path, CompressionLevel, MergeInput, MergeOptions};

/// PDF Slim - Merge plotter PDFs and simplify their vector paths
#[derive(Parser)]
#[command(name = "pdf-slim")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Merge two files at the best compression level
    pdf-slim -C 9 -o merged.pdf map.pdf profile.pdf

    # Take pages 0, 5, 4, 3 and 8 to the end
    pdf-slim \"input.pdf[0,5...2,8..-1]\"

    # Copy pages without simplifying their content
    pdf-slim -O 0 \"plot*.pdf\"")]
struct Cli {
    /// Input PDF files (in order), each optionally followed by a page
    /// selector such as "[0,5...2,8..-1]". Supports glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output PDF file path [default: first input with _1, _2, ... appended]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Compression level: 0 none, 1 (fastest) to 9 (smallest), anything else the default
    #[arg(short = 'C', long = "compression", allow_negative_numbers = true)]
    compression: Option<i64>,

    /// Optimization flag: 0 copies content streams unchanged
    #[arg(short = 'O', long = "optimize", default_value_t = 1)]
    optimize: u32,

    /// Print the page count and document information of each input instead of merging
    #[arg(long)]
    info: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let inputs = expand_globs(cli.inputs)?;

    if cli.info {
        return cmd_info(&inputs);
    }

    let output = match cli.output {
        Some(path) => path,
        None => next_output_path(&inputs[0].path)?,
    };

    let options = MergeOptions {
        inputs,
        output_path: output,
        compression: cli.compression.map_or(CompressionLevel::Default, CompressionLevel::from_level),
        optimize: cli.optimize != 0,
    };

    let summary = merge_pdfs(&options).context("Failed to merge PDFs")?;
    eprintln!("Merged {} pages to: {}", summary.page_count, options.output_path.display());

    Ok(())
}

/// Split off page selectors and expand glob patterns in input paths
///
/// A selector applies to every file its pattern matches. Matches of one
/// pattern are sorted; the order of the patterns themselves is kept.
fn expand_globs(arguments: Vec<String>) -> Result<Vec<MergeInput>> {
    let mut inputs = Vec::new();

    for argument in arguments {
        let (pattern, pages) = split_input_argument(&argument)?;

        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched: Vec<PathBuf> = Vec::new();
            for entry in glob(&pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))? {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => log::warn!("glob error for {}: {}", pattern, e),
                }
            }
            if matched.is_empty() {
                bail!("No files matched pattern: {}", pattern);
            }
            matched.sort();
            inputs.extend(matched.into_iter().map(|path| MergeInput {
                path,
                pages: pages.clone(),
            }));
        } else {
            // No glob characters, treat as literal path
            inputs.push(MergeInput {
                path: PathBuf::from(pattern),
                pages,
            });
        }
    }

    Ok(inputs)
}

/// Show the page count and document information of each input
fn cmd_info(inputs: &[MergeInput]) -> Result<()> {
    for input in inputs {
        let metadata = extract_metadata(&input.path)
            .with_context(|| format!("Failed to read {}", input.path.display()))?;

        println!("File: {}", input.path.display());
        println!("Pages: {}", metadata.page_count);
        println!("Objects: {}", metadata.object_count);

        if let Some(title) = metadata.title {
            println!("Title: {}", title);
        }
        if let Some(author) = metadata.author {
            println!("Author: {}", author);
        }
        if let Some(producer) = metadata.producer {
            println!("Producer: {}", producer);
        }
        if input.pages != PageSelection::all() {
            let selected = input.pages.resolve(metadata.page_count)?;
            println!("Selected [{}]: {:?}", input.pages, selected);
        }
    }

    Ok(())
}
