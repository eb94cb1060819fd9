//! strace2csv - streaming conversion of strace output to CSV
//!
//! Records come from a [`source::TraceSource`] (the bundled
//! [`strace::StraceReader`] parses strace text) and are written one row at
//! a time by [`csv_output::CsvWriter`], driven by [`convert::convert`].
//!
//! ```
//! use strace2csv::{convert::convert, csv_output::CsvOptions, strace::StraceReader};
//!
//! let trace = "1.234567 open(\"/tmp/x\", 0) = 3 <0.000012>\n";
//! let reader = StraceReader::new(trace.as_bytes()).unwrap();
//! let mut out = Vec::new();
//! convert(reader, &mut out, CsvOptions::default()).unwrap();
//!
//! let csv = String::from_utf8(out).unwrap();
//! assert!(csv.ends_with("1.234567,\"open\",0,2,\"/tmp/x\",0,,,,,3,0.000012\n"));
//! ```

pub mod cli;
pub mod convert;
pub mod csv_output;
pub mod record;
pub mod source;
pub mod strace;
