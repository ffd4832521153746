//! duplex CLI
//!
//! Compiles dual-mode markup documents to HTML (or canonical markup via
//! `--emit markup`). The core pipeline is pure and never fails on malformed
//! input; this layer owns file/stdio plumbing, diagnostic presentation, and
//! exit-code policy.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use markup::{
    emit, format, parse, validate, Diagnostic, EmitOptions, FormatOptions, ParseOptions, PiMode,
    Severity, StrictStrategy, ValidateOptions,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "duplex", version, about = "Dual-mode markup compiler")]
struct Cli {
    /// Input file; reads stdin when omitted.
    input: Option<PathBuf>,

    /// Output file; writes stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output kind.
    #[arg(long, value_enum, default_value_t = EmitKind::Html)]
    emit: EmitKind,

    /// Strict-element transformation strategy for HTML output.
    #[arg(long, value_enum, default_value_t = StrategyArg::CustomTag)]
    strategy: StrategyArg,

    /// Spaces per indent level; 0 disables pretty-printing.
    #[arg(long, default_value_t = 0)]
    indent: usize,

    /// Prepend the standard doctype line to HTML output.
    #[arg(long)]
    doctype: bool,

    /// Parse as a fragment (no implied html/head/body).
    #[arg(long)]
    fragment: bool,

    /// Keep whitespace-only text nodes in lenient content.
    #[arg(long)]
    preserve_whitespace: bool,

    /// Prefix for custom-tag strategy element names, e.g. `x-`.
    #[arg(long, default_value = "")]
    custom_prefix: String,

    /// Processing-instruction rendering.
    #[arg(long, value_enum, default_value_t = PiArg::Keep)]
    pi: PiArg,

    /// Validate only; exit non-zero when errors are found.
    #[arg(long)]
    check: bool,

    /// Write a version-3 source map next to the output.
    #[arg(long, value_name = "FILE")]
    source_map: Option<PathBuf>,

    /// Embed the original source in the source map.
    #[arg(long)]
    embed_source: bool,

    /// Skip the xml:id uniqueness check.
    #[arg(long)]
    no_id_check: bool,

    /// Suppress diagnostic output.
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EmitKind {
    Html,
    Markup,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    CustomTag,
    DataAttribute,
    Passthrough,
    Strip,
}

impl From<StrategyArg> for StrictStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::CustomTag => StrictStrategy::CustomTag,
            StrategyArg::DataAttribute => StrictStrategy::DataAttribute,
            StrategyArg::Passthrough => StrictStrategy::Passthrough,
            StrategyArg::Strip => StrictStrategy::Strip,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PiArg {
    Keep,
    Comment,
    Strip,
}

impl From<PiArg> for PiMode {
    fn from(arg: PiArg) -> Self {
        match arg {
            PiArg::Keep => PiMode::Keep,
            PiArg::Comment => PiMode::Comment,
            PiArg::Strip => PiMode::Strip,
        }
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("duplex: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let (source, input_label) = read_input(cli.input.as_deref())?;

    let parse_options = ParseOptions {
        preserve_whitespace: cli.preserve_whitespace,
        fragment: cli.fragment,
    };

    let mut diagnostics: Vec<Diagnostic>;
    let output_text;
    let mut source_map_json = None;

    match cli.emit {
        EmitKind::Markup => {
            let (formatted, format_diagnostics) = format(
                &source,
                &FormatOptions {
                    indent: " ".repeat(if cli.indent == 0 { 2 } else { cli.indent }),
                },
            );
            diagnostics = format_diagnostics;
            output_text = formatted;
        }
        EmitKind::Html => {
            let outcome = parse(&source, &parse_options);
            diagnostics = outcome.diagnostics;
            diagnostics.extend(validate(
                &outcome.root,
                &ValidateOptions {
                    enforce_id_uniqueness: !cli.no_id_check,
                    ..ValidateOptions::default()
                },
            ));

            let emit_options = EmitOptions {
                strategy: cli.strategy.into(),
                indent: " ".repeat(cli.indent),
                doctype: cli.doctype,
                custom_element_prefix: cli.custom_prefix.clone(),
                processing_instruction_mode: cli.pi.into(),
                source_map: cli.source_map.is_some(),
                source_file: Some(input_label.clone()),
                source_content: cli.embed_source.then(|| source.clone()),
                ..EmitOptions::default()
            };
            let emitted = emit(&outcome.root, &emit_options);
            output_text = emitted.output;
            source_map_json = emitted.source_map.map(|map| map.to_json());
        }
    }

    if !cli.quiet {
        for diagnostic in &diagnostics {
            eprintln!("{input_label}:{diagnostic}");
        }
    }
    let has_errors = diagnostics
        .iter()
        .any(|diagnostic| diagnostic.severity == Severity::Error);

    if cli.check {
        return Ok(if has_errors {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    write_output(cli.output.as_deref(), &output_text)?;
    if let (Some(map_path), Some(json)) = (&cli.source_map, source_map_json) {
        fs::write(map_path, json)
            .with_context(|| format!("writing source map {}", map_path.display()))?;
    }
    Ok(ExitCode::SUCCESS)
}

fn read_input(path: Option<&std::path::Path>) -> Result<(String, String)> {
    match path {
        Some(path) => {
            let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Ok((
                String::from_utf8_lossy(&bytes).into_owned(),
                path.display().to_string(),
            ))
        }
        None => {
            let mut bytes = Vec::new();
            io::stdin()
                .read_to_end(&mut bytes)
                .context("reading stdin")?;
            Ok((String::from_utf8_lossy(&bytes).into_owned(), "<stdin>".to_string()))
        }
    }
}

fn write_output(path: Option<&std::path::Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes()).context("writing stdout")?;
            Ok(())
        }
    }
}
