//! Scratch copies of intermediate documents
//!
//! Each pass output can be written to a named temporary file so a failed
//! conversion can be inspected afterwards. Files are removed when the
//! [`ScratchArtifact`] is dropped, unless the policy retains them (the debug
//! flag is set), in which case the path is logged and left on disk.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempPath};

/// Prefix of export intermediates
pub const EXPORT_PREFIX: &str = "wt1-";
/// Prefix of import intermediates
pub const IMPORT_PREFIX: &str = "wt2-";

/// Where intermediates go and whether they outlive the run
#[derive(Debug, Clone, Default)]
pub struct ScratchPolicy {
    /// `None` disables scratch files entirely
    dir: Option<PathBuf>,
    retain: bool,
}

impl ScratchPolicy {
    /// Write intermediates to `dir`, keeping them when `retain` is set
    pub fn new(dir: impl Into<PathBuf>, retain: bool) -> Self {
        Self {
            dir: Some(dir.into()),
            retain,
        }
    }

    /// Write intermediates to the system temporary directory
    pub fn system(retain: bool) -> Self {
        Self::new(std::env::temp_dir(), retain)
    }

    /// Never touch the filesystem
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn retains(&self) -> bool {
        self.retain
    }

    /// Persist one intermediate document
    ///
    /// # Parameters
    /// * `prefix` - [`EXPORT_PREFIX`] or [`IMPORT_PREFIX`]
    /// * `label` - Short stage name appended to the prefix (e.g., "pass1")
    /// * `content` - Document text
    ///
    /// # Returns
    /// * `Ok(Some(ScratchArtifact))` - The file was written
    /// * `Ok(None)` - Scratch files are disabled
    /// * `Err(std::io::Error)` - The scratch directory is not writable
    pub fn persist(
        &self,
        prefix: &str,
        label: &str,
        content: &str,
    ) -> Result<Option<ScratchArtifact>, std::io::Error> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };

        let mut file = Builder::new()
            .prefix(&format!("{prefix}{label}-"))
            .suffix(".xml")
            .tempfile_in(dir)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        let path = file.into_temp_path();

        if self.retain {
            let kept = path.keep().map_err(|e| e.error)?;
            log::info!("Kept intermediate {}", kept.display());
            Ok(Some(ScratchArtifact::Kept(kept)))
        } else {
            log::debug!("Wrote intermediate {}", path.display());
            Ok(Some(ScratchArtifact::Temporary(path)))
        }
    }
}

/// A written intermediate document
#[derive(Debug)]
pub enum ScratchArtifact {
    /// Deleted when dropped
    Temporary(TempPath),
    /// Left on disk for inspection
    Kept(PathBuf),
}

impl ScratchArtifact {
    pub fn path(&self) -> &Path {
        match self {
            ScratchArtifact::Temporary(path) => path,
            ScratchArtifact::Kept(path) => path,
        }
    }

    pub fn is_kept(&self) -> bool {
        matches!(self, ScratchArtifact::Kept(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_artifact_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let policy = ScratchPolicy::new(dir.path(), false);
        let artifact = policy
            .persist(EXPORT_PREFIX, "pass1", "<container/>")
            .unwrap()
            .unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.exists());
        assert!(!artifact.is_kept());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("wt1-pass1-"));
        assert!(name.ends_with(".xml"));

        drop(artifact);
        assert!(!path.exists());
    }

    #[test]
    fn test_retained_artifact_survives_drop() {
        let dir = tempfile::tempdir().unwrap();
        let policy = ScratchPolicy::new(dir.path(), true);
        let artifact = policy
            .persist(IMPORT_PREFIX, "pass3", "<quiz/>")
            .unwrap()
            .unwrap();
        let path = artifact.path().to_path_buf();
        drop(artifact);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<quiz/>");
    }

    #[test]
    fn test_disabled_policy_writes_nothing() {
        let policy = ScratchPolicy::disabled();
        assert!(!policy.is_enabled());
        assert!(policy.persist(EXPORT_PREFIX, "x", "y").unwrap().is_none());
    }

    #[test]
    fn test_unwritable_directory() {
        let policy = ScratchPolicy::new("/nonexistent/scratch/dir", false);
        assert!(policy.persist(EXPORT_PREFIX, "x", "y").is_err());
    }
}
