//! MAS-Lang Command Line Interface
//!
//! Usage:
//!   maslang [OPTIONS] <FILE>
//!   maslang --help
//!
//! Examples:
//!   maslang loops.mas                       # Check, unroll by 2, emit C
//!   maslang -u 4 --emit source loops.mas    # Show the unrolled program
//!   maslang -O0 --emit ast loops.mas        # Parse, check and dump the AST
//!   maslang --emit tokens loops.mas         # Just tokenize

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use maslang::codegen::{self, Target};
use maslang::frontend::Lexer;
use maslang::transform::MAX_FACTOR;
use maslang::utils::errors::CompileError;
use maslang::utils::location::{SourceMap, Span};
use maslang::CompileConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// MAS-Lang compiler front end and loop unroller
#[derive(Parser, Debug)]
#[command(name = "maslang")]
#[command(version)]
#[command(about = "Parse, check and loop-unroll MAS-Lang programs", long_about = None)]
struct Cli {
    /// Input file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Optimization level (0 disables unrolling)
    #[arg(short = 'O', long, default_value = "1", value_parser = clap::value_parser!(u8).range(0..=1))]
    opt_level: u8,

    /// Unroll factor
    #[arg(short = 'u', long, value_name = "K", default_value = "2", value_parser = clap::value_parser!(i64).range(1..=MAX_FACTOR))]
    unroll: i64,

    /// Disable loop unrolling
    #[arg(long)]
    no_unroll: bool,

    /// What to emit
    #[arg(long, default_value = "c")]
    emit: EmitKind,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmitKind {
    /// Token stream
    Tokens,
    /// Abstract Syntax Tree, after optimization
    Ast,
    /// Abstract Syntax Tree as JSON, after optimization
    Json,
    /// MAS-Lang source, after optimization
    Source,
    /// C code
    C,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(config.log_level())
        .format_timestamp(None)
        .init();

    info!("maslang v{}", maslang::VERSION);
    debug!("Input file: {:?}", cli.input);

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read input file: {:?}", cli.input))?;

    if cli.emit == EmitKind::Tokens {
        let tokens = match Lexer::new(&source).tokenize() {
            Ok(tokens) => tokens,
            Err(e) => fail(&cli.input, &source, &e.into())?,
        };
        let listing: String = tokens
            .iter()
            .map(|t| format!("{:<8} {}\n", t.span.start.to_string(), t))
            .collect();
        return write_output(&cli.output, &listing);
    }

    info!("Parsing and checking...");
    let program = match maslang::analyze(&source) {
        Ok(program) => program,
        Err(e) => fail(&cli.input, &source, &e)?,
    };

    debug!("Compile config: {:?}", config);

    info!("Optimizing...");
    let program = maslang::optimize(program, &config);

    let output = match cli.emit {
        EmitKind::Ast => format!("{:#?}\n", program),
        EmitKind::Json => {
            let mut json = serde_json::to_string_pretty(&program).context("Failed to serialize AST")?;
            json.push('\n');
            json
        }
        EmitKind::Source | EmitKind::C | EmitKind::Tokens => match codegen::generate(&program, config.target) {
            Ok(code) => code,
            Err(e) => fail(&cli.input, &source, &e)?,
        },
    };

    write_output(&cli.output, &output)
}

fn build_config(cli: &Cli) -> CompileConfig {
    let mut config = match cli.opt_level {
        0 => CompileConfig::unoptimized(),
        _ => CompileConfig::default(),
    };

    if cli.no_unroll {
        config.enable_unrolling = false;
    }
    config.unroll_factor = cli.unroll;
    config.target = match cli.emit {
        EmitKind::Source => Target::Source,
        _ => Target::C,
    };
    config.verbosity = if cli.quiet { 0 } else { cli.verbose.saturating_add(1) };

    config
}

/// Print every diagnostic of `error` with its source line, then give up.
fn fail<T>(path: &Path, source: &str, error: &CompileError) -> Result<T> {
    let map = SourceMap::new(source);
    let show = |message: &str, span: &Span| {
        eprintln!("error: {}", message);
        if let Some(snippet) = map.snippet(span) {
            eprintln!("  --> {}:{}", path.display(), span.start);
            for line in snippet.lines() {
                eprintln!("   | {}", line);
            }
        }
    };

    match error {
        CompileError::Semantic(errors) => {
            for e in errors.iter() {
                show(&format!("{}: {}", e.kind, e.message), &e.span);
            }
            bail!("{} semantic error(s) in {}", errors.len(), path.display());
        }
        CompileError::Lexer(e) => show(&e.message, &e.span),
        CompileError::Syntax(e) => show(&e.to_string(), &e.span),
        CompileError::Codegen(_) | CompileError::Io(_) => {}
    }
    Err(anyhow::anyhow!("{}", error).context(format!("Failed to compile {}", path.display())))
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content)
                .with_context(|| format!("Failed to write output file: {:?}", p))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
