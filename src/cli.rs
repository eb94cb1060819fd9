//! CLI argument parsing for strace2csv

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "strace2csv")]
#[command(version)]
#[command(
    about = "Convert strace output into CSV for spreadsheet analysis",
    long_about = None
)]
pub struct Cli {
    /// strace output to read (standard input when omitted or "-")
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Print to file instead of the standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Field delimiter
    #[arg(
        short = 'd',
        long = "delimiter",
        value_name = "CHAR",
        default_value = ",",
        value_parser = parse_delimiter
    )]
    pub delimiter: char,

    /// Enable debug tracing on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Input path, with "-" meaning standard input
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().filter(|path| path.as_os_str() != "-")
    }
}

/// A delimiter is exactly one character that cannot clash with quoting or rows
fn parse_delimiter(value: &str) -> Result<char, String> {
    let mut chars = value.chars();
    let delimiter = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return Err(format!("expected a single character, got {:?}", value)),
    };
    match delimiter {
        '"' => Err("the quote character cannot be used as a delimiter".to_string()),
        '\n' | '\r' => Err("line breaks cannot be used as a delimiter".to_string()),
        c => Ok(c),
    }
}
