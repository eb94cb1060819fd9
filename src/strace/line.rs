//! Grammar for a single line of strace output

use super::args::{find_call_close, parse_integer};
use crate::record::Scalar;
use regex::Regex;
use std::sync::OnceLock;

/// What a syscall line describes
#[derive(Debug, Clone, PartialEq)]
pub enum CallKind {
    /// `name(args) = result`
    Complete {
        arguments: String,
        result: Scalar,
        elapsed: Option<f64>,
    },
    /// `name(args <unfinished ...>`
    Unfinished { arguments: String },
    /// `<... name resumed> args) = result`
    Resumed {
        arguments: String,
        result: Scalar,
        elapsed: Option<f64>,
    },
}

/// One parsed syscall line
#[derive(Debug, Clone, PartialEq)]
pub struct StraceLine {
    pub pid: Option<i64>,
    pub timestamp: f64,
    pub name: String,
    pub kind: CallKind,
}

const UNFINISHED_MARKER: &str = "<unfinished ...>";

fn pid_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\[pid\s+([0-9]+)\]|([0-9]+))\s+").expect("pid prefix pattern is valid")
    })
}

fn timestamp_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:([0-9]{1,2}):([0-9]{2}):([0-9]{2})(\.[0-9]+)?|([0-9]+\.[0-9]+))\s+")
            .expect("timestamp pattern is valid")
    })
}

fn call_head() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z_][\w]*)\(").expect("call pattern is valid"))
}

fn resumed_head() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^<\.\.\.\s+([A-Za-z_][\w]*)\s+resumed>\s?").expect("resumed pattern is valid")
    })
}

fn elapsed_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*<([0-9]+(?:\.[0-9]+)?)>\s*$").expect("elapsed pattern is valid"))
}

/// Parse one line.
///
/// Returns `Ok(None)` for lines that carry no syscall (signals, exits,
/// tool diagnostics, blank lines) and `Err` with a message for lines that
/// look like syscalls but cannot be understood.
pub fn parse_line(line: &str) -> Result<Option<StraceLine>, String> {
    let line = line.trim_end_matches(&['\n', '\r'][..]);
    if line.trim().is_empty() || line.starts_with("strace: ") || line.starts_with("[ ") {
        return Ok(None);
    }

    let mut rest = line.trim_start();
    let mut pid = None;
    if let Some(caps) = pid_prefix().captures(rest) {
        let digits = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        pid = Some(
            digits
                .parse::<i64>()
                .map_err(|_| format!("pid out of range: {}", digits))?,
        );
        rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
    }

    let mut timestamp = None;
    if let Some(caps) = timestamp_prefix().captures(rest) {
        timestamp = Some(parse_timestamp(&caps)?);
        rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
    }

    if rest.starts_with("+++ ") || rest.starts_with("--- ") || rest.starts_with("???(") {
        return Ok(None);
    }

    let (name, kind) = if let Some(caps) = resumed_head().captures(rest) {
        let name = caps[1].to_string();
        let body = &rest[caps.get(0).map_or(0, |m| m.end())..];
        let (arguments, result, elapsed) = parse_call_tail(body)?;
        (
            name,
            CallKind::Resumed {
                arguments,
                result,
                elapsed,
            },
        )
    } else if let Some(caps) = call_head().captures(rest) {
        let name = caps[1].to_string();
        let body = &rest[caps.get(0).map_or(0, |m| m.end())..];
        let kind = match body.trim_end().strip_suffix(UNFINISHED_MARKER) {
            Some(partial) => CallKind::Unfinished {
                arguments: unfinished_arguments(partial),
            },
            None => {
                let (arguments, result, elapsed) = parse_call_tail(body)?;
                CallKind::Complete {
                    arguments,
                    result,
                    elapsed,
                }
            }
        };
        (name, kind)
    } else {
        return Err(format!("unrecognized line: {}", rest));
    };

    let timestamp = timestamp.ok_or_else(|| {
        "missing timestamp (capture with strace -t, -tt, -ttt or -r)".to_string()
    })?;

    Ok(Some(StraceLine {
        pid,
        timestamp,
        name,
        kind,
    }))
}

fn parse_timestamp(caps: &regex::Captures<'_>) -> Result<f64, String> {
    if let Some(seconds) = caps.get(5) {
        return seconds
            .as_str()
            .parse::<f64>()
            .map_err(|e| format!("bad timestamp {}: {}", seconds.as_str(), e));
    }

    let field = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    let fraction = caps
        .get(4)
        .map(|m| format!("0{}", m.as_str()))
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(field(1) * 3600.0 + field(2) * 60.0 + field(3) + fraction)
}

/// Split `args) = result <elapsed>` into its three parts
fn parse_call_tail(body: &str) -> Result<(String, Scalar, Option<f64>), String> {
    let close =
        find_call_close(body).ok_or_else(|| format!("unterminated argument list: {}", body))?;
    let arguments = body[..close].trim().to_string();
    let mut after = &body[close + 1..];

    let mut elapsed = None;
    if let Some(caps) = elapsed_suffix().captures(after) {
        elapsed = caps[1].parse::<f64>().ok();
        after = &after[..caps.get(0).map_or(after.len(), |m| m.start())];
    }

    let result = match after.trim().strip_prefix('=') {
        Some(value) => parse_result(value.trim()),
        None => Scalar::Absent,
    };

    Ok((arguments, result, elapsed))
}

fn parse_result(value: &str) -> Scalar {
    if value.is_empty() {
        return Scalar::Absent;
    }
    parse_integer(value).unwrap_or_else(|| Scalar::text(value))
}

fn unfinished_arguments(partial: &str) -> String {
    let partial = match find_call_close(partial) {
        Some(close) => &partial[..close],
        None => partial,
    };
    partial.trim().trim_end_matches(',').trim_end().to_string()
}
