//! Buffered collection of outcome records.
//!
//! The sink is owned by a single consumer task; sessions hand their outcomes
//! over a channel instead of locking a shared buffer. Draining happens in
//! batches to bound memory during long runs while keeping stdout writes off
//! the per-fetch hot path.

use std::io::{self, Write};

/// Number of buffered records beyond which the sink drains itself.
pub const FLUSH_THRESHOLD: usize = 1000;

/// Accumulates outcome lines and writes them out in batches.
#[derive(Debug)]
pub struct RecordSink<W> {
    out: W,
    lines: Vec<String>,
    threshold: usize,
    recorded: u64,
}

impl<W: Write> RecordSink<W> {
    /// Creates a sink draining to `out` at the default threshold.
    pub fn new(out: W) -> Self {
        Self::with_threshold(out, FLUSH_THRESHOLD)
    }

    /// Creates a sink with a custom buffering threshold.
    pub fn with_threshold(out: W, threshold: usize) -> Self {
        Self {
            out,
            lines: Vec::new(),
            threshold,
            recorded: 0,
        }
    }

    /// Appends one record, draining the buffer first once it exceeds the
    /// threshold.
    pub fn record(&mut self, line: String) -> io::Result<()> {
        if self.lines.len() > self.threshold {
            self.drain()?;
        }
        self.lines.push(line);
        self.recorded += 1;
        Ok(())
    }

    /// Writes out everything still buffered and flushes the writer.
    ///
    /// Called once at run end so no record is lost.
    pub fn flush(&mut self) -> io::Result<()> {
        self.drain()?;
        self.out.flush()
    }

    /// Number of records accepted so far.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Consumes the sink, returning the writer.
    ///
    /// Lines not yet drained are dropped; call [`flush`](Self::flush) first.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn drain(&mut self) -> io::Result<()> {
        for line in self.lines.drain(..) {
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_record_is_lost() {
        let mut sink = RecordSink::new(Vec::new());
        for i in 0..2500 {
            sink.record(format!("{i} /file000.txt 200 OK 5 0.000001"))
                .unwrap();
        }
        sink.flush().unwrap();

        assert_eq!(sink.recorded(), 2500);
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 2500);
    }

    #[test]
    fn drains_when_the_threshold_is_exceeded() {
        let mut sink = RecordSink::with_threshold(Vec::new(), 10);
        for i in 0..12 {
            sink.record(format!("line {i}")).unwrap();
        }

        // the buffer crossed the threshold, so earlier lines hit the writer
        // before any flush
        assert!(!sink.into_inner().is_empty());
    }

    #[test]
    fn flush_empties_the_buffer() {
        let mut sink = RecordSink::new(Vec::new());
        sink.record("one".to_owned()).unwrap();
        sink.flush().unwrap();
        sink.record("two".to_owned()).unwrap();
        sink.flush().unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "one\ntwo\n");
    }
}
