//! CLI entry point — spec.md §6: `rvcc [-o <path>] <input>`.
//!
//! A thin wrapper: read, call [`rvcc::compile`], write. Every
//! user-facing diagnostic goes through `CompileError`'s `Display`
//! impl on stderr; this is the only place in the crate allowed to call
//! `process::exit`.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rvcc::{compile, CompilerConfig};

/// Compile a C-like source file to RISC-V 64 assembly.
#[derive(Parser, Debug)]
#[command(name = "rvcc", version, about)]
struct Cli {
    /// Output path. `-` (or omitted) writes to stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Input path. `-` reads from stdin.
    input: PathBuf,

    /// Include `.file`/line debug directives in the emitted assembly.
    #[arg(short = 'g', long = "debug-info")]
    debug_info: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rvcc: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let (source, input_label) = read_input(&cli.input).map_err(|e| e.to_string())?;

    let config = CompilerConfig::new().with_debug_directives(cli.debug_info);
    let asm = compile(&source, &input_label, &config).map_err(|e| e.to_string())?;

    write_output(cli.output.as_deref(), &asm).map_err(|e| e.to_string())
}

fn read_input(path: &PathBuf) -> io::Result<(String, String)> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok((buf, "<stdin>".to_string()))
    } else {
        let buf = fs::read_to_string(path)?;
        Ok((buf, path.display().to_string()))
    }
}

fn write_output(path: Option<&std::path::Path>, asm: &str) -> io::Result<()> {
    match path {
        None => io::stdout().write_all(asm.as_bytes()),
        Some(p) if p.as_os_str() == "-" => io::stdout().write_all(asm.as_bytes()),
        Some(p) => fs::write(p, asm),
    }
}
