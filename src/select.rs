//! Mismatch selection
//!
//! Assertions reached through helper modules report their own file; only
//! those located in the file under test may lead to edits.

use std::path::Path;

use crate::common::paths;
use crate::protocol::AssertionRecord;

/// A captured assertion in the file under test whose actual value differs
pub type Mismatch = AssertionRecord;

/// Keep records that differ and belong to `target`, in execution order
pub fn select(records: &[AssertionRecord], target: &Path) -> Vec<Mismatch> {
    let target = paths::resolve(target);
    records
        .iter()
        .filter(|record| record.is_mismatch())
        .filter(|record| {
            let same_file = paths::resolve(&record.call_site.file) == target;
            if !same_file {
                tracing::debug!(call_site = %record.call_site, "Ignoring mismatch outside file under test");
            }
            same_file
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CallSite;

    fn record(file: &Path, line: usize, actual: &str, expected: &str) -> AssertionRecord {
        AssertionRecord {
            call_site: CallSite::new(file, line, 1),
            actual: actual.to_string(),
            expected: expected.to_string(),
        }
    }

    #[test]
    fn test_select_keeps_only_differing_records() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.ts");
        std::fs::write(&file, "").unwrap();

        let records = vec![
            record(&file, 1, "a", "a"),
            record(&file, 2, "b", "x"),
            record(&file, 3, "c ", "c"),
        ];
        let selected = select(&records, &file);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].call_site.line, 2);
        assert_eq!(selected[1].call_site.line, 3);
    }

    #[test]
    fn test_select_drops_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.ts");
        let helper = dir.path().join("helper.ts");
        std::fs::write(&file, "").unwrap();
        std::fs::write(&helper, "").unwrap();

        let records = vec![record(&helper, 1, "a", "b"), record(&file, 5, "c", "d")];
        let selected = select(&records, &file);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].call_site.line, 5);
    }

    #[test]
    fn test_select_matches_equivalent_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.ts");
        std::fs::write(&file, "").unwrap();

        let reported = dir.path().join(".").join("test.ts");
        let selected = select(&[record(&reported, 1, "new", "old")], &file);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_select_preserves_execution_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.ts");
        std::fs::write(&file, "").unwrap();

        let records = vec![
            record(&file, 9, "1", "0"),
            record(&file, 3, "2", "0"),
            record(&file, 9, "3", "0"),
        ];
        let lines: Vec<_> = select(&records, &file).iter().map(|m| m.call_site.line).collect();
        assert_eq!(lines, vec![9, 3, 9]);
    }
}
