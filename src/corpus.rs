//! Corpus index: enumerate test vectors and derive their expectations.
//!
//! Vectors are discovered once at harness start and are read-only afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use minefield_core::ExpectedTag;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};

/// One input test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVector {
    /// File name; this is what the result log records.
    pub id: String,
    pub path: PathBuf,
    pub expected: ExpectedTag,
}

impl TestVector {
    /// Build a vector from its path. Returns `None` for paths without a UTF-8 file name.
    pub fn new(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let id = path.file_name()?.to_str()?.to_string();
        let expected = ExpectedTag::from_name(&id);
        Some(Self { id, path, expected })
    }

    /// Read the vector's bytes.
    pub fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        fs::read(&self.path)
    }
}

/// The set of vectors for one run.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    vectors: Vec<TestVector>,
}

impl Corpus {
    /// Discover vectors under `dir` (recursively), applying the extension and single-vector filters.
    #[tracing::instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load(dir: &Path, config: &HarnessConfig) -> HarnessResult<Self> {
        let mut paths = Vec::new();
        collect_vector_files(dir, &config.vector_extension, &mut paths).map_err(|source| HarnessError::Corpus {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut vectors = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(vector) = TestVector::new(&path) else {
                tracing::warn!(path = %path.display(), "skipping vector with a non UTF-8 name");
                continue;
            };
            if let Some(only) = &config.restrict_to {
                if &vector.id != only {
                    continue;
                }
            }
            if vector.id.contains(['\t', '\n', '\r']) {
                return Err(HarnessError::InvalidName(vector.id));
            }
            vectors.push(vector);
        }

        tracing::debug!(count = vectors.len(), "corpus loaded");
        Ok(Self::from_vectors(vectors))
    }

    /// Build a corpus from explicit vectors, sorted by file name then path.
    pub fn from_vectors(mut vectors: Vec<TestVector>) -> Self {
        vectors.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.path.cmp(&b.path)));
        Self { vectors }
    }

    /// Look a vector up by the id the result log records. Ids are bare file names, so anything carrying a
    /// path separator never resolves.
    pub fn get(&self, id: &str) -> Option<&TestVector> {
        if id.contains(['/', '\\']) {
            return None;
        }
        let start = self.vectors.partition_point(|v| v.id.as_str() < id);
        self.vectors.get(start).filter(|v| v.id == id)
    }

    pub fn vectors(&self) -> &[TestVector] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Walk `dir`, skipping hidden directories, and collect files with `extension`.
fn collect_vector_files(dir: &Path, extension: &str, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry_path = entry?.path();
        let name = entry_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if entry_path.is_dir() {
            if !name.starts_with('.') {
                collect_vector_files(&entry_path, extension, out)?;
            }
        } else if entry_path.extension().and_then(|e| e.to_str()) == Some(extension) {
            out.push(entry_path);
        }
    }
    Ok(())
}
