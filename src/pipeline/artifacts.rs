//! Artifact Publishing
//!
//! Steps only assign output slots; the pipeline runner publishes pending
//! slots through an [`ArtifactSink`] after each step returns. Agent tools use
//! the same sink for their side effects.

use async_trait::async_trait;
use chrono::Local;
use dashmap::DashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::types::{Result, ResultExt, WeaveError};

/// Destination for published artifacts
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Write `content` at `relative_path`, replacing any previous content.
    /// Returns a display location for the written artifact.
    async fn write(&self, relative_path: &str, content: &str) -> Result<String>;

    /// Human-readable root of this sink
    fn location(&self) -> String;
}

pub type SharedSink = Arc<dyn ArtifactSink>;

// =============================================================================
// Filesystem Sink
// =============================================================================

/// Writes artifacts below a root directory
#[derive(Debug, Clone)]
pub struct FsArtifactSink {
    root: PathBuf,
}

impl FsArtifactSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Sink rooted at `base/<timestamp>` using a chrono format string
    pub fn timestamped(base: &Path, format: &str) -> Result<Self> {
        let mut stamp = String::new();
        write!(stamp, "{}", Local::now().format(format)).map_err(|_| {
            WeaveError::Config(format!("invalid output timestamp format: {}", format))
        })?;
        Ok(Self::new(base.join(stamp)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactSink for FsArtifactSink {
    async fn write(&self, relative_path: &str, content: &str) -> Result<String> {
        let path = self.root.join(relative_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(format!("creating {}", parent.display()))?;
        }

        tokio::fs::write(&path, content)
            .await
            .with_context(format!("writing {}", path.display()))?;

        debug!("Wrote {} ({} bytes)", path.display(), content.len());
        Ok(path.display().to_string())
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}

// =============================================================================
// In-Memory Sink
// =============================================================================

/// Keeps artifacts in memory (tests, dry runs)
#[derive(Debug, Default)]
pub struct MemorySink {
    files: DashMap<String, String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, relative_path: &str) -> Option<String> {
        self.files.get(relative_path).map(|v| v.value().clone())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Stored paths, sorted
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn write(&self, relative_path: &str, content: &str) -> Result<String> {
        self.files
            .insert(relative_path.to_string(), content.to_string());
        Ok(format!("memory://{}", relative_path))
    }

    fn location(&self) -> String {
        "memory://".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fs_sink_creates_nested_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let sink = FsArtifactSink::new(temp_dir.path());

        sink.write("entities/Employee.cs", "class Employee {}")
            .await
            .unwrap();
        sink.write("database_model.md", "erDiagram").await.unwrap();

        let written =
            std::fs::read_to_string(temp_dir.path().join("entities/Employee.cs")).unwrap();
        assert_eq!(written, "class Employee {}");
        assert!(temp_dir.path().join("database_model.md").exists());
    }

    #[tokio::test]
    async fn test_fs_sink_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let sink = FsArtifactSink::new(temp_dir.path());

        sink.write("a.md", "first").await.unwrap();
        sink.write("a.md", "second").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("a.md")).unwrap(),
            "second"
        );
    }

    #[test]
    fn test_timestamped_root() {
        let temp_dir = TempDir::new().unwrap();
        let sink = FsArtifactSink::timestamped(temp_dir.path(), "run_%Y").unwrap();
        let name = sink.root().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("run_20"));
    }

    #[test]
    fn test_invalid_timestamp_format_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            FsArtifactSink::timestamped(temp_dir.path(), "%Q"),
            Err(WeaveError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_sink() {
        let sink = MemorySink::new();
        sink.write("b.md", "2").await.unwrap();
        sink.write("a.md", "1").await.unwrap();

        assert_eq!(sink.paths(), vec!["a.md", "b.md"]);
        assert_eq!(sink.get("a.md").as_deref(), Some("1"));
    }
}
