//! Temporary build artifacts owned by one run
//!
//! Artifacts live beside the file under test so relative imports and
//! source maps resolve the same way they would for the original. Names get
//! a random component so runs on different files in one directory do not
//! collide.

use std::io;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

/// Build output and source map for one run
#[derive(Debug)]
pub struct Scratch {
    artifact: PathBuf,
    source_map: PathBuf,
}

impl Scratch {
    /// Reserve an artifact name next to `file`
    pub fn beside(file: &Path) -> Result<Self> {
        let dir = file.parent().unwrap_or(Path::new("."));
        let artifact = tempfile::Builder::new()
            .prefix(".expect_test_")
            .suffix(".js")
            .tempfile_in(dir)?
            .into_temp_path()
            .keep()
            .map_err(|e| Error::Io(e.error))?;

        let mut source_map = artifact.clone().into_os_string();
        source_map.push(".map");

        Ok(Self {
            artifact,
            source_map: PathBuf::from(source_map),
        })
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn paths(&self) -> [&Path; 2] {
        [&self.artifact, &self.source_map]
    }

    /// Delete every artifact, attempting each one regardless of the others
    ///
    /// Returns the failures; a file that is already gone is not one.
    pub fn cleanup(self) -> Vec<Error> {
        self.paths()
            .into_iter()
            .filter_map(|path| match std::fs::remove_file(path) {
                Ok(()) => None,
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(error) => Some(Error::Cleanup {
                    path: path.to_path_buf(),
                    error,
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_names_are_unique_and_beside_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.ts");

        let a = Scratch::beside(&file).unwrap();
        let b = Scratch::beside(&file).unwrap();
        assert_ne!(a.artifact(), b.artifact());
        assert_eq!(a.artifact().parent(), Some(dir.path()));
        assert!(a.paths()[1].to_string_lossy().ends_with(".js.map"));
    }

    #[test]
    fn test_cleanup_removes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = Scratch::beside(&dir.path().join("test.ts")).unwrap();
        let [artifact, map] = scratch.paths().map(Path::to_path_buf);
        std::fs::write(&map, "{}").unwrap();

        assert!(scratch.cleanup().is_empty());
        assert!(!artifact.exists());
        assert!(!map.exists());
    }

    #[test]
    fn test_cleanup_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = Scratch::beside(&dir.path().join("test.ts")).unwrap();
        std::fs::remove_file(scratch.artifact()).unwrap();
        assert!(scratch.cleanup().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_cleanup_continues_after_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = Scratch::beside(&dir.path().join("test.ts")).unwrap();
        let [artifact, map] = scratch.paths().map(Path::to_path_buf);

        // A directory at the artifact path makes remove_file fail.
        std::fs::remove_file(&artifact).unwrap();
        std::fs::create_dir(&artifact).unwrap();
        std::fs::write(&map, "{}").unwrap();

        let failures = scratch.cleanup();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], Error::Cleanup { .. }));
        assert!(!map.exists());
    }
}
