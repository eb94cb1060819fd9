//! Stream driver: pulls records from a source and pushes rows into a sink

use crate::csv_output::{CsvOptions, CsvWriter};
use crate::source::{SourceGuard, TraceSource};
use std::io::{self, Write};
use thiserror::Error;

/// Conversion failure, split by the boundary it came from
#[derive(Error, Debug)]
pub enum ConvertError<E: std::error::Error + 'static> {
    /// The trace source failed; its error is passed through untouched
    #[error(transparent)]
    Source(E),

    #[error("failed to write CSV output")]
    Write(#[source] io::Error),
}

impl<E: std::error::Error + 'static> ConvertError<E> {
    pub fn is_source(&self) -> bool {
        matches!(self, ConvertError::Source(_))
    }
}

/// What a successful conversion produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionSummary {
    pub records: u64,
    pub has_pids: bool,
}

/// Convert every record from `source` into CSV on `sink`.
///
/// The source is closed on every exit path. Rows already written when a
/// failure occurs are left in place.
pub fn convert<S, W>(
    source: S,
    sink: W,
    options: CsvOptions,
) -> Result<ConversionSummary, ConvertError<S::Error>>
where
    S: TraceSource,
    W: Write,
{
    let mut source = SourceGuard::new(source);
    let has_pids = source.has_pids();
    tracing::debug!(has_pids, delimiter = %options.delimiter, "starting conversion");

    let mut writer = CsvWriter::new(sink, has_pids, options);
    while let Some(record) = source.next_record().map_err(ConvertError::Source)? {
        writer.write_record(&record).map_err(ConvertError::Write)?;
    }

    let records = writer.rows_written();
    writer.finish().map_err(ConvertError::Write)?;
    tracing::debug!(records, "conversion finished");

    Ok(ConversionSummary { records, has_pids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Scalar, TraceRecord};
    use crate::source::VecSource;
    use std::fmt;

    #[test]
    fn test_convert_scenario_a() {
        let record = TraceRecord::new(1.234567, "open")
            .with_arguments(vec![Scalar::text("/tmp/x"), Scalar::Integer(0)])
            .with_return_value(3i64)
            .with_elapsed_time(0.000012);
        let mut out = Vec::new();

        let summary = convert(
            VecSource::new(false, vec![record]),
            &mut out,
            CsvOptions::default(),
        )
        .unwrap();

        assert_eq!(summary.records, 1);
        assert!(!summary.has_pids);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "TIMESTAMP,SYSCALL,SPLIT,ARGC,ARG1,ARG2,ARG3,ARG4,ARG5,ARG6,RESULT,ELAPSED\n\
             1.234567,\"open\",0,2,\"/tmp/x\",0,,,,,3,0.000012\n"
        );
    }

    #[test]
    fn test_convert_empty_stream() {
        let mut source = VecSource::new(true, Vec::new());
        let mut out = Vec::new();

        let summary = convert(&mut source, &mut out, CsvOptions::default()).unwrap();

        assert_eq!(summary.records, 0);
        assert!(out.is_empty());
        assert!(source.is_closed());
    }

    #[test]
    fn test_convert_preserves_order() {
        let records = ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, name)| TraceRecord::new(i as f64, *name).with_pid(1))
            .collect();
        let mut out = Vec::new();

        convert(VecSource::new(true, records), &mut out, CsvOptions::default()).unwrap();

        let text = String::from_utf8(out).unwrap();
        let names: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|line| line.split(',').nth(2).unwrap())
            .collect();
        assert_eq!(names, vec!["\"a\"", "\"b\"", "\"c\""]);
    }

    #[derive(Debug)]
    struct BadLine;

    impl fmt::Display for BadLine {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("bad line")
        }
    }

    impl std::error::Error for BadLine {}

    /// Yields one record, then fails
    struct FlakySource {
        pulled: usize,
        closes: usize,
    }

    impl TraceSource for FlakySource {
        type Error = BadLine;

        fn has_pids(&self) -> bool {
            false
        }

        fn next_record(&mut self) -> Result<Option<TraceRecord>, BadLine> {
            self.pulled += 1;
            if self.pulled == 1 {
                Ok(Some(TraceRecord::new(0.5, "brk")))
            } else {
                Err(BadLine)
            }
        }

        fn close(&mut self) {
            self.closes += 1;
        }
    }

    #[test]
    fn test_convert_source_failure_passes_through() {
        let mut source = FlakySource {
            pulled: 0,
            closes: 0,
        };
        let mut out = Vec::new();

        let err = convert(&mut source, &mut out, CsvOptions::default()).unwrap_err();

        assert!(err.is_source());
        assert!(matches!(err, ConvertError::Source(BadLine)));
        assert_eq!(err.to_string(), "bad line");
        assert_eq!(source.closes, 1);
        // The row emitted before the failure stays
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed pipe"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_convert_write_failure_aborts_and_closes() {
        let mut source = VecSource::new(false, vec![TraceRecord::new(0.0, "write")]);

        let err = convert(&mut source, ClosedPipe, CsvOptions::default()).unwrap_err();

        assert!(matches!(err, ConvertError::Write(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert!(source.is_closed());
    }
}
