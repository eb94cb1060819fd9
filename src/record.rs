//! Trace record data model
//!
//! One `TraceRecord` per completed (or abandoned) system call, as produced by
//! a [`TraceSource`](crate::source::TraceSource).

use std::fmt;

/// A single scalar value carried by a syscall argument or result
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Free-form text (paths, flags, structs, error strings)
    Text(String),
    /// Decimal integer
    Integer(i64),
    /// Floating-point number
    Float(f64),
    /// No value (e.g. a call that never returned)
    Absent,
}

impl Scalar {
    /// Convenience constructor for text values
    pub fn text(value: impl Into<String>) -> Self {
        Scalar::Text(value.into())
    }

    /// Returns true for `Integer` and `Float`
    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Integer(_) | Scalar::Float(_))
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Absent, Into::into)
    }
}

impl fmt::Display for Scalar {
    /// Raw (unescaped) textual form
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Integer(n) => write!(f, "{}", n),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Absent => Ok(()),
        }
    }
}

/// A structured system-call event
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    /// Process id, present only when the source tracks pids for the whole stream
    pub pid: Option<i64>,
    /// Seconds since an arbitrary, trace-relevant epoch
    pub timestamp: f64,
    pub syscall_name: String,
    /// Up to six arguments, in call order
    pub arguments: Vec<Scalar>,
    /// The trace marked this call as not completed in one piece
    pub was_unfinished: bool,
    pub return_value: Scalar,
    /// Time spent in the call, in seconds
    pub elapsed_time: Option<f64>,
}

impl TraceRecord {
    /// Create a finished record with no arguments, no result and no timing
    pub fn new(timestamp: f64, syscall_name: impl Into<String>) -> Self {
        Self {
            pid: None,
            timestamp,
            syscall_name: syscall_name.into(),
            arguments: Vec::new(),
            was_unfinished: false,
            return_value: Scalar::Absent,
            elapsed_time: None,
        }
    }

    pub fn with_pid(mut self, pid: i64) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_arguments(mut self, arguments: Vec<Scalar>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_return_value(mut self, value: impl Into<Scalar>) -> Self {
        self.return_value = value.into();
        self
    }

    pub fn with_elapsed_time(mut self, seconds: f64) -> Self {
        self.elapsed_time = Some(seconds);
        self
    }

    pub fn unfinished(mut self) -> Self {
        self.was_unfinished = true;
        self
    }
}
