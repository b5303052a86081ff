//! Initial scan of watched roots
//!
//! Reports every existing file once as added, so the first batch reflects
//! the starting state of the tree.

use crate::ignore::IgnoreRules;
use crate::translate::FileStat;
use std::path::PathBuf;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Collect every non-ignored file under the rule set's root
pub fn initial_files(rules: &IgnoreRules, recursive: bool) -> Vec<(PathBuf, FileStat)> {
    let mut files = Vec::new();
    let mut walker = WalkDir::new(rules.root()).follow_links(false);
    if !recursive {
        walker = walker.max_depth(1);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !rules.should_ignore(e.path(), e.file_type().is_dir()))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Initial scan skipped an entry: {}", e);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => files.push((entry.into_path(), FileStat::from_metadata(&metadata))),
            Err(e) => debug!("Could not stat {}: {}", entry.path().display(), e),
        }
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ignore::IgnoreConfig;
    use std::fs;
    use tempfile::TempDir;

    fn names(files: &[(PathBuf, FileStat)], root: &std::path::Path) -> Vec<String> {
        let mut names: Vec<_> = files
            .iter()
            .map(|(p, _)| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_scan_lists_files_and_skips_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::create_dir_all(root.join("target")).unwrap();
        fs::write(root.join("src/lib.rs"), b"lib").unwrap();
        fs::write(root.join("src/nested/mod.rs"), b"mod").unwrap();
        fs::write(root.join(".git/HEAD"), b"ref").unwrap();
        fs::write(root.join("target/out"), b"bin").unwrap();
        fs::write(root.join(".gitignore"), b"target/\n").unwrap();

        let rules = IgnoreRules::load(root, IgnoreConfig::default()).unwrap();
        let files = initial_files(&rules, true);

        assert_eq!(
            names(&files, root),
            vec![".gitignore", "src/lib.rs", "src/nested/mod.rs"]
        );
        let lib = files.iter().find(|(p, _)| p.ends_with("lib.rs")).unwrap();
        assert_eq!(lib.1.len, 3);
    }

    #[test]
    fn test_non_recursive_scan_stays_at_top_level() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("top.txt"), b"t").unwrap();
        fs::write(root.join("sub/deep.txt"), b"d").unwrap();

        let rules = IgnoreRules::load(root, IgnoreConfig::default()).unwrap();
        assert_eq!(names(&initial_files(&rules, false), root), vec!["top.txt"]);
    }
}
