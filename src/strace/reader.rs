//! Lazy `TraceSource` over strace text output

use super::args::parse_arguments;
use super::line::{parse_line, CallKind, StraceLine};
use super::StraceError;
use crate::record::{Scalar, TraceRecord};
use crate::source::TraceSource;
use std::collections::{HashMap, VecDeque};
use std::io::BufRead;

/// A call seen as `<unfinished ...>` and waiting for its resumption
#[derive(Debug)]
struct ParkedCall {
    timestamp: f64,
    name: String,
    arguments: String,
}

/// Streams `TraceRecord`s out of strace text, one line at a time.
///
/// Whether the stream carries pids is decided from the first syscall line,
/// which is read during construction and replayed as the first record.
pub struct StraceReader<R: BufRead> {
    input: R,
    buffer: String,
    line_no: usize,
    has_pids: bool,
    lookahead: Option<(usize, StraceLine)>,
    parked: HashMap<Option<i64>, ParkedCall>,
    ready: VecDeque<TraceRecord>,
    exhausted: bool,
    closed: bool,
}

impl<R: BufRead> StraceReader<R> {
    /// Wrap `input`, reading ahead to the first syscall line
    pub fn new(input: R) -> Result<Self, StraceError> {
        let mut reader = Self {
            input,
            buffer: String::new(),
            line_no: 0,
            has_pids: false,
            lookahead: None,
            parked: HashMap::new(),
            ready: VecDeque::new(),
            exhausted: false,
            closed: false,
        };

        reader.lookahead = reader.read_syscall_line()?;
        reader.has_pids = reader
            .lookahead
            .as_ref()
            .is_some_and(|(_, line)| line.pid.is_some());
        tracing::debug!(has_pids = reader.has_pids, "detected strace pid layout");

        Ok(reader)
    }

    /// Next line that describes a syscall, or `None` at end of input
    fn read_syscall_line(&mut self) -> Result<Option<(usize, StraceLine)>, StraceError> {
        loop {
            self.buffer.clear();
            if self.input.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            match parse_line(&self.buffer) {
                Ok(Some(line)) => return Ok(Some((self.line_no, line))),
                Ok(None) => {
                    tracing::trace!(line = self.line_no, "skipping non-syscall line");
                }
                Err(message) => {
                    return Err(StraceError::Parse {
                        line: self.line_no,
                        message,
                    })
                }
            }
        }
    }

    fn next_line(&mut self) -> Result<Option<(usize, StraceLine)>, StraceError> {
        match self.lookahead.take() {
            Some(line) => Ok(Some(line)),
            None => self.read_syscall_line(),
        }
    }

    /// Turn one line into zero, one or two ready records
    fn process(&mut self, line_no: usize, line: StraceLine) -> Result<(), StraceError> {
        if line.pid.is_some() != self.has_pids {
            return Err(StraceError::InconsistentPid {
                line: line_no,
                expected: self.has_pids,
            });
        }

        let StraceLine {
            pid,
            timestamp,
            name,
            kind,
        } = line;

        match kind {
            CallKind::Complete {
                arguments,
                result,
                elapsed,
            } => {
                self.ready.push_back(TraceRecord {
                    pid,
                    timestamp,
                    syscall_name: name,
                    arguments: parse_arguments(&arguments),
                    was_unfinished: false,
                    return_value: result,
                    elapsed_time: elapsed,
                });
            }
            CallKind::Unfinished { arguments } => {
                let call = ParkedCall {
                    timestamp,
                    name,
                    arguments,
                };
                if let Some(previous) = self.parked.insert(pid, call) {
                    tracing::warn!(
                        line = line_no,
                        syscall = %previous.name,
                        "unfinished call superseded before it resumed"
                    );
                    self.ready.push_back(abandoned(pid, previous));
                }
            }
            CallKind::Resumed {
                arguments,
                result,
                elapsed,
            } => {
                let parked = match self.parked.remove(&pid) {
                    Some(call) if call.name == name => Some(call),
                    Some(call) => {
                        self.parked.insert(pid, call);
                        None
                    }
                    None => None,
                };

                let (timestamp, arguments) = match parked {
                    Some(call) => (call.timestamp, join_arguments(&call.arguments, &arguments)),
                    None => {
                        tracing::debug!(line = line_no, syscall = %name, "resumed call without a start");
                        (timestamp, arguments)
                    }
                };

                self.ready.push_back(TraceRecord {
                    pid,
                    timestamp,
                    syscall_name: name,
                    arguments: parse_arguments(&arguments),
                    was_unfinished: true,
                    return_value: result,
                    elapsed_time: elapsed,
                });
            }
        }
        Ok(())
    }

    /// Flush calls still unfinished at end of input, oldest first
    fn drain_parked(&mut self) {
        let mut leftovers: Vec<_> = self.parked.drain().collect();
        leftovers.sort_by(|a, b| a.1.timestamp.total_cmp(&b.1.timestamp));
        if !leftovers.is_empty() {
            tracing::debug!(count = leftovers.len(), "calls never resumed before end of trace");
        }
        self.ready
            .extend(leftovers.into_iter().map(|(pid, call)| abandoned(pid, call)));
    }
}

fn abandoned(pid: Option<i64>, call: ParkedCall) -> TraceRecord {
    TraceRecord {
        pid,
        timestamp: call.timestamp,
        syscall_name: call.name,
        arguments: parse_arguments(&call.arguments),
        was_unfinished: true,
        return_value: Scalar::Absent,
        elapsed_time: None,
    }
}

fn join_arguments(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{}, {}", head, tail),
    }
}

impl<R: BufRead> TraceSource for StraceReader<R> {
    type Error = StraceError;

    fn has_pids(&self) -> bool {
        self.has_pids
    }

    fn next_record(&mut self) -> Result<Option<TraceRecord>, StraceError> {
        loop {
            if self.closed {
                return Ok(None);
            }
            if let Some(record) = self.ready.pop_front() {
                return Ok(Some(record));
            }
            if self.exhausted {
                return Ok(None);
            }

            match self.next_line()? {
                Some((line_no, line)) => self.process(line_no, line)?,
                None => {
                    self.exhausted = true;
                    self.drain_parked();
                }
            }
        }
    }

    fn close(&mut self) {
        if !self.closed {
            tracing::trace!(lines = self.line_no, "closing strace reader");
        }
        self.closed = true;
        self.lookahead = None;
        self.parked.clear();
        self.ready.clear();
    }
}
