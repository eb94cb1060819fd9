//! CSV output format for syscall traces
//!
//! Rows are written as soon as each record arrives; the only state carried
//! between records is whether the header has gone out yet.
//!
//! Quoting is deliberately simple: text fields are wrapped in quotes with
//! inner quotes doubled, numbers are never quoted, and delimiters or
//! backslashes inside text get no extra treatment.

use crate::record::{Scalar, TraceRecord};
use std::fmt::Write as _;
use std::io::{self, Write};

/// Number of argument columns in every row
pub const ARGUMENT_COLUMNS: usize = 6;

/// Default field delimiter
pub const DEFAULT_DELIMITER: char = ',';

/// Default quote character for text fields
pub const DEFAULT_QUOTE: char = '"';

/// Column names following the optional PID column
const COLUMNS: [&str; 12] = [
    "TIMESTAMP", "SYSCALL", "SPLIT", "ARGC", "ARG1", "ARG2", "ARG3", "ARG4", "ARG5", "ARG6",
    "RESULT", "ELAPSED",
];

/// Output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: char,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl CsvOptions {
    pub fn with_delimiter(delimiter: char) -> Self {
        Self { delimiter }
    }
}

/// Escape a scalar for output.
///
/// Absent values become the empty string, numbers their decimal form,
/// and text is quoted with every `quote` inside doubled.
pub fn escape(value: &Scalar, quote: char) -> String {
    match value {
        Scalar::Absent => String::new(),
        Scalar::Integer(n) => n.to_string(),
        Scalar::Float(x) => x.to_string(),
        Scalar::Text(s) => quote_text(s, quote),
    }
}

fn quote_text(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        if c == quote {
            out.push(quote);
        }
        out.push(c);
    }
    out.push(quote);
    out
}

/// Escaped argument at `index`, or an empty column when the record has fewer
/// arguments. Arguments past the sixth are never asked for.
pub fn argument_column(arguments: &[Scalar], index: usize) -> String {
    arguments
        .get(index)
        .map(|arg| escape(arg, DEFAULT_QUOTE))
        .unwrap_or_default()
}

/// Header line (without trailing newline)
pub fn header(include_pid: bool, delimiter: char) -> String {
    let mut line = String::new();
    if include_pid {
        line.push_str("PID");
        line.push(delimiter);
    }
    for (i, column) in COLUMNS.iter().enumerate() {
        if i > 0 {
            line.push(delimiter);
        }
        line.push_str(column);
    }
    line
}

/// Format one record as a row (without trailing newline)
pub fn format_row(record: &TraceRecord, include_pid: bool, delimiter: char) -> String {
    let mut row = String::with_capacity(128);
    let d = delimiter;

    if include_pid {
        // A pid-less record in a pid stream still gets its (empty) column
        if let Some(pid) = record.pid {
            let _ = write!(row, "{}", pid);
        }
        row.push(d);
    }

    let _ = write!(row, "{:.6}", record.timestamp);
    row.push(d);
    row.push_str(&quote_text(&record.syscall_name, DEFAULT_QUOTE));
    row.push(d);
    row.push(if record.was_unfinished { '1' } else { '0' });
    row.push(d);
    let _ = write!(row, "{}", record.arguments.len());

    for index in 0..ARGUMENT_COLUMNS {
        row.push(d);
        row.push_str(&argument_column(&record.arguments, index));
    }

    row.push(d);
    row.push_str(&escape(&record.return_value, DEFAULT_QUOTE));
    row.push(d);
    if let Some(elapsed) = record.elapsed_time {
        let _ = write!(row, "{:.6}", elapsed);
    }

    row
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmitterState {
    AwaitingFirstRecord,
    Streaming,
}

/// Streaming CSV writer.
///
/// The PID column decision is fixed at construction; the header is written
/// right before the first row, so a stream with no records produces no output.
#[derive(Debug)]
pub struct CsvWriter<W: Write> {
    sink: W,
    include_pid: bool,
    delimiter: char,
    state: EmitterState,
    rows: u64,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(sink: W, include_pid: bool, options: CsvOptions) -> Self {
        Self {
            sink,
            include_pid,
            delimiter: options.delimiter,
            state: EmitterState::AwaitingFirstRecord,
            rows: 0,
        }
    }

    pub fn include_pid(&self) -> bool {
        self.include_pid
    }

    /// Number of data rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Whether the header has been emitted
    pub fn is_streaming(&self) -> bool {
        self.state == EmitterState::Streaming
    }

    /// Write one record, preceded by the header if this is the first one
    pub fn write_record(&mut self, record: &TraceRecord) -> io::Result<()> {
        if self.state == EmitterState::AwaitingFirstRecord {
            let mut line = header(self.include_pid, self.delimiter);
            line.push('\n');
            self.sink.write_all(line.as_bytes())?;
            self.state = EmitterState::Streaming;
            tracing::debug!(include_pid = self.include_pid, "wrote CSV header");
        }

        let mut row = format_row(record, self.include_pid, self.delimiter);
        row.push('\n');
        self.sink.write_all(row.as_bytes())?;
        self.rows += 1;
        Ok(())
    }

    /// Flush the sink and hand it back
    pub fn finish(mut self) -> io::Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_a() -> TraceRecord {
        TraceRecord::new(1.234567, "open")
            .with_arguments(vec![Scalar::text("/tmp/x"), Scalar::Integer(0)])
            .with_return_value(3i64)
            .with_elapsed_time(0.000012)
    }

    #[test]
    fn test_escape_absent_is_empty() {
        assert_eq!(escape(&Scalar::Absent, '"'), "");
    }

    #[test]
    fn test_escape_numbers_unquoted() {
        assert_eq!(escape(&Scalar::Integer(-1), '"'), "-1");
        assert_eq!(escape(&Scalar::Float(0.5), '"'), "0.5");
    }

    #[test]
    fn test_escape_text_quoted() {
        assert_eq!(escape(&Scalar::text("hello"), '"'), "\"hello\"");
        assert_eq!(escape(&Scalar::text(""), '"'), "\"\"");
    }

    #[test]
    fn test_escape_doubles_quotes() {
        assert_eq!(
            escape(&Scalar::text("He said \"hi\""), '"'),
            "\"He said \"\"hi\"\"\""
        );
    }

    #[test]
    fn test_escape_leaves_delimiter_and_backslash() {
        assert_eq!(escape(&Scalar::text("a,b\\n"), '"'), "\"a,b\\n\"");
    }

    #[test]
    fn test_escape_custom_quote() {
        assert_eq!(escape(&Scalar::text("it's"), '\''), "'it''s'");
    }

    #[test]
    fn test_numeric_looking_text_stays_quoted() {
        assert_eq!(escape(&Scalar::text("42"), '"'), "\"42\"");
    }

    #[test]
    fn test_argument_column_in_range() {
        let args = vec![Scalar::text("x"), Scalar::Integer(7)];
        assert_eq!(argument_column(&args, 0), "\"x\"");
        assert_eq!(argument_column(&args, 1), "7");
    }

    #[test]
    fn test_argument_column_out_of_range() {
        let args = vec![Scalar::Integer(7)];
        assert_eq!(argument_column(&args, 1), "");
        assert_eq!(argument_column(&args, 5), "");
    }

    #[test]
    fn test_header_without_pid() {
        assert_eq!(
            header(false, ','),
            "TIMESTAMP,SYSCALL,SPLIT,ARGC,ARG1,ARG2,ARG3,ARG4,ARG5,ARG6,RESULT,ELAPSED"
        );
    }

    #[test]
    fn test_header_with_pid() {
        assert_eq!(
            header(true, ','),
            "PID,TIMESTAMP,SYSCALL,SPLIT,ARGC,ARG1,ARG2,ARG3,ARG4,ARG5,ARG6,RESULT,ELAPSED"
        );
    }

    #[test]
    fn test_format_row_scenario_a() {
        assert_eq!(
            format_row(&scenario_a(), false, ','),
            "1.234567,\"open\",0,2,\"/tmp/x\",0,,,,,3,0.000012"
        );
    }

    #[test]
    fn test_format_row_unfinished_with_pid() {
        let record = TraceRecord::new(9.0, "read")
            .with_pid(42)
            .with_arguments(vec![Scalar::Integer(5)])
            .unfinished();
        assert_eq!(
            format_row(&record, true, ','),
            "42,9.000000,\"read\",1,1,5,,,,,,,"
        );
    }

    #[test]
    fn test_format_row_syscall_name_quotes_doubled() {
        let record = TraceRecord::new(0.0, "we\"ird");
        assert!(format_row(&record, false, ',').starts_with("0.000000,\"we\"\"ird\","));
    }

    #[test]
    fn test_format_row_truncates_extra_arguments() {
        let args = (0..8).map(Scalar::Integer).collect();
        let record = TraceRecord::new(0.0, "mmap").with_arguments(args);
        assert_eq!(
            format_row(&record, false, ','),
            "0.000000,\"mmap\",0,8,0,1,2,3,4,5,,"
        );
    }

    #[test]
    fn test_format_row_missing_pid_keeps_column() {
        let record = TraceRecord::new(0.0, "getpid");
        let row = format_row(&record, true, ',');
        assert!(row.starts_with(",0.000000,"));
        assert_eq!(row.split(',').count(), 14);
    }

    #[test]
    fn test_writer_empty_stream_writes_nothing() {
        let writer = CsvWriter::new(Vec::new(), true, CsvOptions::default());
        assert!(!writer.is_streaming());
        assert!(writer.finish().unwrap().is_empty());
    }

    #[test]
    fn test_writer_header_once() {
        let mut writer = CsvWriter::new(Vec::new(), false, CsvOptions::default());
        writer.write_record(&scenario_a()).unwrap();
        writer.write_record(&scenario_a()).unwrap();
        assert!(writer.is_streaming());
        assert_eq!(writer.rows_written(), 2);

        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(out.matches("TIMESTAMP").count(), 1);
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn test_writer_custom_delimiter() {
        let mut writer = CsvWriter::new(Vec::new(), false, CsvOptions::with_delimiter(';'));
        writer.write_record(&scenario_a()).unwrap();
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "TIMESTAMP;SYSCALL;SPLIT;ARGC;ARG1;ARG2;ARG3;ARG4;ARG5;ARG6;RESULT;ELAPSED\n\
             1.234567;\"open\";0;2;\"/tmp/x\";0;;;;;3;0.000012\n"
        );
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed pipe"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_surfaces_write_failure() {
        let mut writer = CsvWriter::new(FailingSink, false, CsvOptions::default());
        let err = writer.write_record(&scenario_a()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(writer.rows_written(), 0);
    }
}
