//! Input File Sources
//!
//! Reads the three raw inputs of an analysis run: the table DDL file, the
//! flat procedures directory and the allowlisted application files.
//! Legacy scripts are often Windows-1252 or Latin-1, so each file's encoding
//! is detected before decoding; undecodable bytes are replaced, never fatal.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::types::{AppFile, Result, ResultExt, WeaveError};

/// Read a file as text in its detected encoding
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(format!("reading {}", path.display()))?;
    Ok(decode(&bytes, &path.display().to_string()))
}

/// Decode bytes using their BOM or a detected encoding, falling back to
/// UTF-8 with replacement characters when detection does not fit.
pub fn decode(bytes: &[u8], origin: &str) -> String {
    let encoding = match Encoding::for_bom(bytes) {
        Some((encoding, _)) => encoding,
        None => {
            if let Ok(text) = std::str::from_utf8(bytes) {
                return text.to_string();
            }
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        }
    };

    let (text, _, had_errors) = encoding.decode(bytes);
    if !had_errors {
        if encoding != UTF_8 {
            debug!("Decoded {} as {}", origin, encoding.name());
        }
        return text.into_owned();
    }

    warn!(
        "{} is not valid {}, decoding as UTF-8 with replacements",
        origin,
        encoding.name()
    );
    String::from_utf8_lossy(bytes).into_owned()
}

/// Map every non-empty file directly inside `dir` (file name → content).
/// Subdirectories are not descended into.
pub fn read_procedures_dir(dir: &Path) -> Result<BTreeMap<String, String>> {
    if !dir.is_dir() {
        return Err(WeaveError::Artifact(format!(
            "procedures directory not found: {}",
            dir.display()
        )));
    }

    let mut files = BTreeMap::new();
    let entries = std::fs::read_dir(dir).with_context(format!("listing {}", dir.display()))?;

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };

        match read_text(&path) {
            Ok(content) if content.trim().is_empty() => {
                debug!("Skipping empty procedure file {}", name);
            }
            Ok(content) => {
                files.insert(name, content);
            }
            Err(e) => warn!("Skipping unreadable procedure file {}: {}", name, e),
        }
    }

    Ok(files)
}

// =============================================================================
// Application Files
// =============================================================================

/// One allowlist entry: a base-name glob plus optional method focus.
///
/// Syntax: `Name.java` or `Name.java:methodA+methodB`.
#[derive(Debug, Clone)]
pub struct AppFileFilter {
    pattern: glob::Pattern,
    methods: Vec<String>,
}

impl AppFileFilter {
    pub fn parse(entry: &str) -> Result<Self> {
        let (name, methods) = match entry.split_once(':') {
            Some((name, methods)) => (
                name.trim(),
                methods
                    .split('+')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            None => (entry.trim(), Vec::new()),
        };

        let pattern = glob::Pattern::new(name)
            .map_err(|e| WeaveError::Config(format!("invalid app file pattern '{}': {}", name, e)))?;

        Ok(Self { pattern, methods })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.matches(file_name)
    }
}

/// Recursive scanner for allowlisted application files
pub struct AppFileScanner {
    root: PathBuf,
    filters: Vec<AppFileFilter>,
}

impl AppFileScanner {
    pub fn new<P: AsRef<Path>>(root: P, allowlist: &[String]) -> Result<Self> {
        let filters = allowlist
            .iter()
            .filter(|e| !e.trim().is_empty())
            .map(|e| AppFileFilter::parse(e))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root: root.as_ref().to_path_buf(),
            filters,
        })
    }

    /// Matching, non-empty files sorted by file name
    pub fn scan(&self) -> Result<Vec<AppFile>> {
        if self.filters.is_empty() {
            return Ok(Vec::new());
        }

        if !self.root.is_dir() {
            return Err(WeaveError::Artifact(format!(
                "application directory not found: {}",
                self.root.display()
            )));
        }

        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .git_exclude(true)
            .follow_links(false)
            .build();

        let mut files = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().to_string())
            else {
                continue;
            };

            let Some(filter) = self.filters.iter().find(|f| f.matches(&file_name)) else {
                continue;
            };

            match read_text(path) {
                Ok(content) if !content.trim().is_empty() => {
                    let mut file = AppFile::new(file_name, content);
                    file.method_names = filter.methods.clone();
                    files.push(file);
                }
                Ok(_) => debug!("Skipping empty application file {}", path.display()),
                Err(e) => warn!("Skipping unreadable application file {}: {}", path.display(), e),
            }
        }

        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(files)
    }
}
