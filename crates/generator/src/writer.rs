//! Document output sinks

use restforge_common::{GeneratorError, OpenApiSpec, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Location of the document under the output directory when no writer is
/// configured
pub const DEFAULT_SPEC_PATH: &str = "rest/openapi.json";

/// Destination of the finalized document
pub trait DocumentSink: Send {
    fn write_document(&mut self, spec: &OpenApiSpec) -> Result<()>;
}

/// Writes the document as pretty-printed JSON to any `Write`
pub struct JsonSink<W: Write + Send> {
    inner: W,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> DocumentSink for JsonSink<W> {
    fn write_document(&mut self, spec: &OpenApiSpec) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.inner, spec)?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()?;
        Ok(())
    }
}

/// Writes the document to a file, creating parent directories
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sink for the default location under `output_dir`
    pub fn in_output_dir(output_dir: &Path) -> Self {
        Self::new(output_dir.join(DEFAULT_SPEC_PATH))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentSink for FileSink {
    fn write_document(&mut self, spec: &OpenApiSpec) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GeneratorError::Generation(format!(
                    "Failed to create directory {:?}: {}",
                    parent, e
                ))
            })?;
        }

        let mut json = spec.to_json_pretty()?;
        json.push('\n');
        fs::write(&self.path, json).map_err(|e| {
            GeneratorError::Generation(format!("Failed to write {:?}: {}", self.path, e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_json_sink_writes_pretty_json() {
        let mut sink = JsonSink::new(Vec::new());
        sink.write_document(&OpenApiSpec::new("Pets", "2.0.0"))
            .unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.ends_with('\n'));
        assert!(out.contains("\n  \"openapi\""));

        let parsed: OpenApiSpec = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.info.version, "2.0.0");
    }

    #[test]
    fn test_file_sink_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let mut sink = FileSink::in_output_dir(temp_dir.path());
        sink.write_document(&OpenApiSpec::default()).unwrap();

        let path = temp_dir.path().join("rest").join("openapi.json");
        assert_eq!(sink.path(), path);
        assert!(path.exists());
    }
}
