//! Debug output channel.
//!
//! The engine reports compile errors, route decisions and (when tracing is
//! enabled) every dispatched match. Messages always go to `tracing`; an
//! optional [`DebugSink`] receives the same lines, e.g. an editor output
//! window or an in-memory buffer.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Receiver of debug lines
pub trait DebugSink: Send + Sync {
    fn append_line(&self, message: &str);
}

/// Sink collecting lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected lines
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DebugSink for MemorySink {
    fn append_line(&self, message: &str) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }
}

/// Handle passed to the compiler and scanner
#[derive(Clone, Default)]
pub struct DebugChannel {
    sink: Option<Arc<dyn DebugSink>>,
    trace: bool,
}

impl fmt::Debug for DebugChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugChannel")
            .field("sink", &self.sink.is_some())
            .field("trace", &self.trace)
            .finish()
    }
}

impl DebugChannel {
    pub fn new(sink: Arc<dyn DebugSink>) -> Self {
        Self {
            sink: Some(sink),
            trace: false,
        }
    }

    /// Enable the per-match trace (builder pattern)
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn is_tracing(&self) -> bool {
        self.trace
    }

    /// Report a problem, e.g. a dropped rule
    pub fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
        self.forward(message);
    }

    /// Report an informational line
    pub fn info(&self, message: &str) {
        tracing::debug!("{}", message);
        self.forward(message);
    }

    /// Report a trace line; the message is only built when tracing is on
    pub fn trace<F>(&self, message: F)
    where
        F: FnOnce() -> String,
    {
        if !self.trace {
            return;
        }

        let message = message();
        tracing::trace!("{}", message);
        self.forward(&message);
    }

    fn forward(&self, message: &str) {
        if let Some(sink) = &self.sink {
            sink.append_line(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_is_lazy_when_disabled() {
        let sink = Arc::new(MemorySink::new());
        let channel = DebugChannel::new(sink.clone());

        channel.trace(|| panic!("must not be evaluated"));
        channel.warn("dropped");

        assert_eq!(sink.lines(), vec!["dropped".to_string()]);
    }

    #[test]
    fn test_trace_forwards_when_enabled() {
        let sink = Arc::new(MemorySink::new());
        let channel = DebugChannel::new(sink.clone()).with_trace(true);

        channel.trace(|| "[main] line: 1".to_string());

        assert_eq!(sink.lines(), vec!["[main] line: 1".to_string()]);
    }

    #[test]
    fn test_default_channel_has_no_sink() {
        let channel = DebugChannel::default();
        channel.warn("nowhere");
        assert!(!channel.is_tracing());
    }
}
