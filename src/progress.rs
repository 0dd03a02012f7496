//! User-facing progress reporting.
//!
//! A run reports what it does as plain text lines, in traversal order,
//! through a [`ProgressSink`] supplied by the caller. The library never
//! prints on its own.

/// Receives human-readable progress lines from a run.
pub trait ProgressSink {
    /// Emits a single line.
    fn emit(&mut self, line: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(&str),
{
    fn emit(&mut self, line: &str) {
        self(line)
    }
}

/// A sink that keeps every line in memory.
///
/// # Examples
///
/// ```
/// use stowaway::progress::{LineCollector, ProgressSink};
///
/// let mut lines = LineCollector::default();
/// lines.emit("Scanned file: a.pdf");
/// assert_eq!(lines.lines(), ["Scanned file: a.pdf"]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct LineCollector {
    lines: Vec<String>,
}

impl LineCollector {
    /// Lines received so far.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Drops all collected lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Consumes the collector, returning its lines.
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl ProgressSink for LineCollector {
    fn emit(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_a_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |line: &str| seen.push(line.to_uppercase());
            sink.emit("one");
            sink.emit("two");
        }
        assert_eq!(seen, vec!["ONE", "TWO"]);
    }

    #[test]
    fn test_collector_clear() {
        let mut collector = LineCollector::default();
        collector.emit("a");
        collector.clear();
        assert!(collector.lines().is_empty());
        collector.emit("b");
        assert_eq!(collector.into_lines(), vec!["b".to_string()]);
    }
}
