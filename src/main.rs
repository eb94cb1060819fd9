use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::process::ExitCode;
use strace2csv::{cli::Cli, convert, csv_output::CsvOptions, strace::StraceReader};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Open the trace input; standard input when no path is given
fn open_input(cli: &Cli) -> Result<Box<dyn BufRead>> {
    match cli.input_path() {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// Open the CSV output; standard output when no path is given
fn open_output(cli: &Cli) -> Result<Box<dyn Write>> {
    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

// Handles opened here are dropped (and files closed) on every return path;
// the standard streams are only locked, never closed.
fn run(cli: &Cli) -> Result<()> {
    let input = open_input(cli)?;
    let output = open_output(cli)?;

    let reader = StraceReader::new(input)?;
    let summary = convert::convert(reader, output, CsvOptions::with_delimiter(cli.delimiter))?;

    tracing::info!(
        records = summary.records,
        has_pids = summary.has_pids,
        "converted trace"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("strace2csv: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
