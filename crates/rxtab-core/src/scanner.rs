//! Input discovery for batch parsing

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files found under one or more roots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Roots that were scanned
    pub roots: Vec<PathBuf>,
    /// Matching files, sorted by path
    pub files: Vec<PathBuf>,
}

impl ScanResult {
    pub fn total_files(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Walk `roots` recursively and collect regular files.
///
/// With an `extension` (compared without the dot, ignoring case) only those files are kept.
/// A root that is itself a file is returned as is.
pub fn scan_inputs<P: AsRef<Path>>(roots: &[P], extension: Option<&str>) -> Result<ScanResult> {
    let extension = extension.map(|e| e.trim_start_matches('.'));
    let mut files = Vec::new();

    for root in roots {
        for entry in WalkDir::new(root.as_ref()).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let wanted = match extension {
                Some(ext) => path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(ext)),
                None => true,
            };
            if wanted {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.log"), "x").unwrap();
        fs::write(dir.path().join("a.LOG"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("nested").join("c.log"), "x").unwrap();

        let result = scan_inputs(&[dir.path()], Some(".log")).unwrap();

        let names: Vec<String> = result
            .files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.LOG", "b.log", "nested/c.log"]);
    }

    #[test]
    fn test_scan_without_extension_and_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.txt");
        fs::write(&file, "x").unwrap();
        fs::write(dir.path().join("other.dat"), "x").unwrap();

        assert_eq!(scan_inputs(&[dir.path()], None).unwrap().total_files(), 2);

        let single = scan_inputs(&[&file, &file], None).unwrap();
        assert_eq!(single.files, vec![file.clone()]);
    }

    #[test]
    fn test_scan_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_inputs(&[dir.path().join("absent")], None).is_err());
    }
}
