//! Injectable sink for recoverable conditions met while loading.
//!
//! Library code never logs skip-and-continue conditions through the global
//! logger directly; it reports them to a [`DiagnosticSink`] so callers can
//! capture or silence them. [`LogSink`] forwards to the `log` facade.

use log::Level;

/// A single reported condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

pub trait DiagnosticSink {
    fn report(&mut self, level: Level, message: &str);

    fn warn(&mut self, message: &str) {
        self.report(Level::Warn, message);
    }
}

/// Forwards every report to the process-wide logger.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, level: Level, message: &str) {
        log::log!(target: "asset", level, "{message}");
    }
}

/// Collects reports in memory.
impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, level: Level, message: &str) {
        self.push(Diagnostic {
            level,
            message: message.to_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_captures_in_order() {
        let mut sink: Vec<Diagnostic> = Vec::new();
        sink.warn("first");
        sink.report(Level::Info, "second");
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0].level, Level::Warn);
        assert_eq!(sink[1].message, "second");
    }
}
