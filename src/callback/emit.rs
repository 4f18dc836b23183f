//! Emission of the finished audit log.
//!
//! The whole log is serialized in one call as a pretty-printed JSON array
//! (four space indent). There is no incremental output.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::callback::types::AuditRecord;
use crate::error::Result;
use crate::traits::AuditSink;

/// Render records as the audit document.
pub fn render(records: &[AuditRecord]) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

/// Choose a sink from an output setting: `stdout`, `stderr`, or a file path.
pub fn sink_for_output(output: &str) -> Result<Arc<dyn AuditSink>> {
    match output {
        "" | "stdout" => Ok(Arc::new(StdoutSink)),
        "stderr" => Ok(Arc::new(WriterSink::new(io::stderr()))),
        path => Ok(Arc::new(WriterSink::create(path)?)),
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Prints the document on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl AuditSink for StdoutSink {
    fn emit(&self, records: &[AuditRecord]) -> Result<()> {
        let document = render(records)?;
        let mut out = io::stdout().lock();
        writeln!(out, "{}", document)?;
        out.flush()?;
        Ok(())
    }
}

/// Writes the document to any writer (a file, stderr, a buffer).
pub struct WriterSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl WriterSink {
    /// Wrap a writer.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Create (or truncate) a file and write to it.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl fmt::Debug for WriterSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSink").finish_non_exhaustive()
    }
}

impl AuditSink for WriterSink {
    fn emit(&self, records: &[AuditRecord]) -> Result<()> {
        let document = render(records)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", document)?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps emitted records and documents in memory. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryBuffer>>,
}

#[derive(Debug, Default)]
struct MemoryBuffer {
    records: Vec<AuditRecord>,
    documents: Vec<String>,
}

impl MemorySink {
    /// Create an empty in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records from every emission, in order.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.inner.lock().records.clone()
    }

    /// Rendered documents, one per emission.
    pub fn documents(&self) -> Vec<String> {
        self.inner.lock().documents.clone()
    }

    /// Number of times `emit` was called.
    pub fn emit_count(&self) -> usize {
        self.inner.lock().documents.len()
    }
}

impl AuditSink for MemorySink {
    fn emit(&self, records: &[AuditRecord]) -> Result<()> {
        let document = render(records)?;
        let mut inner = self.inner.lock();
        inner.records.extend_from_slice(records);
        inner.documents.push(document);
        Ok(())
    }
}
