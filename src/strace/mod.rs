// strace text input
//
// Parses the output of `strace` (with -t/-tt/-ttt/-r timestamps, optional
// -f pid prefixes and optional -T call durations) into trace records.
// Calls split by `<unfinished ...>` / `<... resumed>` are stitched back
// together and flagged as unfinished.

mod args;
mod line;
mod reader;

pub use line::{parse_line, CallKind, StraceLine};
pub use reader::StraceReader;

use thiserror::Error;

/// Errors raised while reading strace output
#[derive(Error, Debug)]
pub enum StraceError {
    #[error("failed to read trace input")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: {}", pid_layout_mismatch(.expected))]
    InconsistentPid { line: usize, expected: bool },
}

fn pid_layout_mismatch(expected: &bool) -> &'static str {
    if *expected {
        "pid prefix missing but the trace started with pids"
    } else {
        "pid prefix present but the trace started without pids"
    }
}
