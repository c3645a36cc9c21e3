// SPDX-License-Identifier: GPL-3.0-only

//! Command-line interface for wa2html.
//!
//! This binary provides the `wa2html` command for converting WhatsApp
//! chat exports from plain text to a static HTML page.

use lexopt::prelude::*;
use snafu::{OptionExt, ensure, prelude::*};
use std::path::{Path, PathBuf};
use wa2html::{parser, renderer};
use walkdir::WalkDir;

/// Where to write the rendered output.
#[derive(Clone)]
enum OutputTarget {
    /// Write to the specified path: a file for a single input, a
    /// directory when several inputs are converted.
    Path(PathBuf),
    /// Write to stdout.
    Stdout,
}

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    input: Vec<PathBuf>,
    output: OutputTarget,
    title: Option<String>,
    strict: bool,
    month_first: bool,
    show_date_index: bool,
    show_timestamps: bool,
    quiet: bool,
    dry_run: bool,
    force: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("at least one input file or directory is required"))]
    NoInputFiles,

    #[snafu(display("cannot output multiple files to stdout"))]
    MultipleFilesToStdout,

    #[snafu(display("failed to create output directory: {source}"))]
    CreateOutputDir { source: std::io::Error },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{} is not valid UTF-8: {source}", path.display()))]
    DecodeFile {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },

    #[snafu(display("failed to parse {}: {source}", path.display()))]
    ParseFile {
        path: PathBuf,
        source: parser::ParseError,
    },

    #[snafu(display("invalid input filename: no file stem"))]
    InvalidFilename,

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert WhatsApp chat exports to static HTML

Usage: {name} [OPTIONS] -i <INPUT> -o <OUTPUT>

Options:
  -i, --input <INPUT>       Input transcript file or directory (repeatable)
  -o, --output <OUTPUT>     Output file (directory for multiple inputs, - for stdout)

Parsing:
      --strict              Fail on malformed lines instead of skipping them
      --month-first         Read ambiguous dates as month/day/year

Rendering:
      --title <TITLE>       Page title (default: input filename)
      --no-date-index       Omit the per-month date index
      --hide-timestamps     Hide message run timestamps

Other options:
  -q, --quiet               Suppress progress messages
  -n, --dry-run             Show what would be processed without writing
  -f, --force               Overwrite existing output files
  -h, --help                Print help
  -V, --version             Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut input = Vec::new();
    let mut output: Option<OutputTarget> = None;
    let mut title = None;
    let mut strict = false;
    let mut month_first = false;
    let mut show_date_index = true;
    let mut show_timestamps = true;
    let mut quiet = false;
    let mut dry_run = false;
    let mut force = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('i') | Long("input") => input.push(parser.value()?.parse()?),
            Short('o') | Long("output") => {
                let val: PathBuf = parser.value()?.parse()?;
                output = Some(if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::Path(val)
                });
            }
            Long("title") => title = Some(parser.value()?.string()?),
            Long("strict") => strict = true,
            Long("month-first") => month_first = true,
            Long("no-date-index") => show_date_index = false,
            Long("hide-timestamps") => show_timestamps = false,
            Short('q') | Long("quiet") => quiet = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('f') | Long("force") => force = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) => input.push(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input,
        output: output.ok_or("missing required option: --output")?,
        title,
        strict,
        month_first,
        show_date_index,
        show_timestamps,
        quiet,
        dry_run,
        force,
    })
}

fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;

    ensure!(!cli.input.is_empty(), NoInputFilesSnafu);

    // Collect all input files first
    let files = collect_input_files(&cli.input);
    ensure!(!files.is_empty(), NoInputFilesSnafu);

    match &cli.output {
        OutputTarget::Stdout => {
            ensure!(files.len() == 1, MultipleFilesToStdoutSnafu);
            process_to_stdout(&files[0], &cli)?;
        }
        OutputTarget::Path(path) if files.len() == 1 && !path.is_dir() => {
            process_to_file(&files[0], path, &cli)?;
        }
        OutputTarget::Path(dir) => {
            if !cli.dry_run {
                std::fs::create_dir_all(dir).context(CreateOutputDirSnafu)?;
            }
            for file in &files {
                let out_name = file.file_stem().context(InvalidFilenameSnafu)?;
                let out_path = dir.join(format!("{}.html", out_name.to_string_lossy()));
                process_to_file(file, &out_path, &cli)?;
            }
        }
    }

    Ok(())
}

/// Collects all transcript files from the given inputs (files and directories).
fn collect_input_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "txt"))
            {
                files.push(entry.path().to_path_buf());
            }
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Creates parse options from CLI arguments.
#[allow(clippy::missing_const_for_fn)]
fn make_parse_options(cli: &Cli) -> parser::ParseOptions {
    parser::ParseOptions {
        date_order: if cli.month_first {
            parser::DateOrder::MonthFirst
        } else {
            parser::DateOrder::DayFirst
        },
        strictness: if cli.strict {
            parser::Strictness::Strict
        } else {
            parser::Strictness::Lenient
        },
    }
}

/// Creates render options from CLI arguments, defaulting the title to the
/// input filename.
fn make_render_options(cli: &Cli, input: &Path) -> renderer::RenderOptions {
    renderer::RenderOptions {
        title: cli.title.clone().or_else(|| {
            input
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        }),
        show_date_index: cli.show_date_index,
        show_timestamps: cli.show_timestamps,
    }
}

/// Reads, parses, and renders a single transcript.
fn convert(input: &Path, cli: &Cli) -> Result<String, Error> {
    let bytes = std::fs::read(input).context(ReadFileSnafu { path: input })?;
    let text = String::from_utf8(bytes).context(DecodeFileSnafu { path: input })?;

    let messages = parser::parse_transcript(&text, &make_parse_options(cli))
        .context(ParseFileSnafu { path: input })?;

    Ok(renderer::render_transcript(
        &messages,
        &make_render_options(cli, input),
    ))
}

/// Processes a single file and outputs to stdout.
fn process_to_stdout(input: &Path, cli: &Cli) -> Result<(), Error> {
    if cli.dry_run {
        eprintln!("Would output {}", input.display());
        return Ok(());
    }

    let html = convert(input, cli)?;
    print!("{html}");
    Ok(())
}

/// Processes a single file and writes to the given output path.
fn process_to_file(input: &Path, out_path: &Path, cli: &Cli) -> Result<(), Error> {
    if cli.dry_run {
        eprintln!("Would write {}", out_path.display());
        return Ok(());
    }

    if out_path.exists() && !cli.force {
        eprintln!(
            "Skipping {} (already exists, use --force to overwrite)",
            out_path.display()
        );
        return Ok(());
    }

    let html = convert(input, cli)?;

    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context(CreateOutputDirSnafu)?;
    }
    std::fs::write(out_path, &html).context(WriteFileSnafu { path: out_path })?;

    if !cli.quiet {
        eprintln!("Wrote {}", out_path.display());
    }
    Ok(())
}
