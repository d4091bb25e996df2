//! Directory walker for discovering Word documents to import

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions picked up by a directory import
///
/// `.doc` files are included so they are reported as unsupported rather
/// than silently skipped.
const WORD_EXTENSIONS: &[&str] = &["docx", "doc"];

/// Errors that can occur during document discovery
#[derive(Debug, thiserror::Error)]
pub enum WalkerError {
    #[error("IO error: {0}")]
    Io(#[from] walkdir::Error),

    #[error("Not a file or directory: {}", .0.display())]
    NotFound(PathBuf),
}

/// Word documents under `root`, sorted by path
///
/// # Parameters
/// * `root` - A directory to walk, or a single file
///
/// # Returns
/// * `Ok(Vec<PathBuf>)` - Matching files; a file `root` is returned as is
/// * `Err(WalkerError)` - `root` does not exist or a directory could not be read
pub fn find_documents(root: &Path) -> Result<Vec<PathBuf>, WalkerError> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(WalkerError::NotFound(root.to_path_buf()));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !is_word_document(path) {
            continue;
        }
        // Word keeps "~$name.docx" lock files next to open documents
        if entry.file_name().to_string_lossy().starts_with("~$") {
            log::debug!("Skipping lock file {}", path.display());
            continue;
        }
        documents.push(path.to_path_buf());
    }

    log::debug!("Found {} documents under {}", documents.len(), root.display());
    Ok(documents)
}

fn is_word_document(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            WORD_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
