use std::{
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use walkdir::WalkDir;

use crate::{Extractor, Record};

/// File extensions treated as requirement documents when walking a
/// directory.
const EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Errors that can occur when loading requirement documents.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The input path does not exist.
    #[error("input not found: {0}")]
    NotFound(PathBuf),

    /// A document could not be read.
    #[error("failed to read {path}")]
    Io {
        /// The document that failed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The directory tree could not be walked.
    #[error("failed to walk input directory")]
    Walk(#[from] walkdir::Error),
}

/// One requirement document held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    text: String,
}

impl Document {
    /// Creates a document from text already in memory.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Reads a single document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be read as
    /// UTF-8 text.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Ok(Self::new(path, text))
    }

    /// Reads the document at `input`, or every `.txt`/`.md` document below
    /// it when it is a directory.
    ///
    /// Directory contents are returned sorted by path.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` does not exist, the directory cannot be
    /// walked, or any document cannot be read.
    #[tracing::instrument]
    pub fn load_all(input: &Path) -> Result<Vec<Self>, LoadError> {
        if !input.exists() {
            return Err(LoadError::NotFound(input.to_path_buf()));
        }
        if input.is_file() {
            return Ok(vec![Self::load(input)?]);
        }

        let paths = collect_document_paths(input)?;
        tracing::debug!(count = paths.len(), "found documents");
        paths.iter().map(|path| Self::load(path)).collect()
    }

    /// Where the document was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The document text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Extracts the records of many documents in parallel.
    ///
    /// Records are concatenated in document order.
    #[must_use]
    pub fn extract_all(documents: &[Self], extractor: &Extractor) -> Vec<Record> {
        documents
            .par_iter()
            .map(|document| {
                let records = extractor.extract(document.text());
                tracing::info!(
                    path = %document.path().display(),
                    records = records.len(),
                    "extracted"
                );
                records
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }
}

fn collect_document_paths(root: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut paths = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() && is_document(entry.path()) => {
                Some(Ok(entry.into_path()))
            }
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|extension| EXTENSIONS.contains(&extension))
}
