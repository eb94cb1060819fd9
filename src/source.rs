//! Trace-event source interface
//!
//! A source exposes one stream-level capability (whether pids are tracked)
//! separately from per-record iteration, plus a release operation that the
//! converter calls exactly once through [`SourceGuard`].

use crate::record::TraceRecord;
use std::convert::Infallible;
use std::ops::{Deref, DerefMut};

/// Lazy, forward-only producer of trace records
pub trait TraceSource {
    /// Failure raised while pulling a record
    type Error: std::error::Error + 'static;

    /// Whether every record in this stream carries a pid
    fn has_pids(&self) -> bool;

    /// Pull the next record; `Ok(None)` once exhausted, on every later call too
    fn next_record(&mut self) -> Result<Option<TraceRecord>, Self::Error>;

    /// Release underlying resources. Safe to call before iteration started.
    fn close(&mut self) {}
}

impl<S: TraceSource + ?Sized> TraceSource for &mut S {
    type Error = S::Error;

    fn has_pids(&self) -> bool {
        (**self).has_pids()
    }

    fn next_record(&mut self) -> Result<Option<TraceRecord>, Self::Error> {
        (**self).next_record()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Scoped acquisition of a source: `close()` runs when the guard drops,
/// on normal completion and on early failure alike.
pub struct SourceGuard<S: TraceSource> {
    source: S,
}

impl<S: TraceSource> SourceGuard<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: TraceSource> Deref for SourceGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.source
    }
}

impl<S: TraceSource> DerefMut for SourceGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: TraceSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        tracing::trace!("releasing trace source");
        self.source.close();
    }
}

/// In-memory source over pre-built records
#[derive(Debug, Clone)]
pub struct VecSource {
    has_pids: bool,
    records: std::vec::IntoIter<TraceRecord>,
    closed: bool,
}

impl VecSource {
    pub fn new(has_pids: bool, records: Vec<TraceRecord>) -> Self {
        Self {
            has_pids,
            records: records.into_iter(),
            closed: false,
        }
    }

    /// Whether `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl TraceSource for VecSource {
    type Error = Infallible;

    fn has_pids(&self) -> bool {
        self.has_pids
    }

    fn next_record(&mut self) -> Result<Option<TraceRecord>, Infallible> {
        Ok(self.records.next())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
