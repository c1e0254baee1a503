//! Text-splice patching
//!
//! Rewrites the first string or template literal found at or after each
//! call-site column, starting on the call-site's line. Cheaper than the
//! structural strategy but only reliable when the assertion is the sole
//! expression on its line.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::line_index::LineIndex;
use super::{literal, PatchOutcome};
use crate::common::{Error, Result};
use crate::protocol::CallSite;
use crate::select::Mismatch;

static LITERAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'|`(?:[^`\\]|\\(?s:.))*`"#)
        .expect("literal pattern is valid")
});

/// Patch raw source text
pub fn patch(file: &Path, source: &str, mismatches: &[Mismatch]) -> Result<PatchOutcome> {
    // Later observations at the same position replace earlier ones.
    let mut by_position: BTreeMap<(usize, usize), &Mismatch> = BTreeMap::new();
    let mut superseded: Vec<CallSite> = Vec::new();
    for mismatch in mismatches {
        let key = (mismatch.call_site.line, mismatch.call_site.column);
        if let Some(old) = by_position.insert(key, mismatch) {
            if old.actual != mismatch.actual {
                tracing::warn!(
                    call_site = %old.call_site,
                    "Call-site observed with differing values; keeping the last one"
                );
            }
            superseded.push(old.call_site.clone());
        }
    }

    let index = LineIndex::new(source);
    let mut out = source.to_string();

    // Descending position: an edit never shifts the offsets of the ones still to come.
    for ((line, column), mismatch) in by_position.iter().rev() {
        let not_found = || Error::PatchTargetNotFound {
            file: file.to_path_buf(),
            line: *line,
            column: *column,
        };
        let offset = index.offset(source, *line, *column).ok_or_else(not_found)?;
        let line_end = index.line_range(*line).ok_or_else(not_found)?.end;

        let found = LITERAL_REGEX
            .find(&out[offset..])
            .filter(|m| offset + m.start() <= line_end)
            .ok_or_else(not_found)?;

        out.replace_range(
            offset + found.start()..offset + found.end(),
            &literal::render(&mismatch.actual),
        );
    }

    Ok(PatchOutcome {
        text: out,
        applied: by_position.len(),
        superseded,
    })
}
