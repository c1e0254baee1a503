//! Source patching
//!
//! Given the text of the file under test and its mismatches (in execution
//! order), produce corrected text in which only the expected-literal
//! arguments at the mismatching call-sites have changed.

mod line_index;
mod literal;
mod splice;
mod structural;
mod whitespace;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::Result;
use crate::protocol::CallSite;
use crate::select::Mismatch;

/// How call-sites are located in source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PatchStrategy {
    /// Find the enclosing call expression in a syntax tree
    #[default]
    Structural,
    /// Replace the first literal at the call-site's line and column
    Splice,
}

/// Result of patching one file
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    /// Corrected source, before formatting
    pub text: String,
    /// Number of call-sites rewritten
    pub applied: usize,
    /// Observations overridden by a later one at the same call
    pub superseded: Vec<CallSite>,
}

/// Patch `source` (the unencoded file contents) with `mismatches`
pub fn apply(
    strategy: PatchStrategy,
    file: &Path,
    source: &str,
    mismatches: &[Mismatch],
) -> Result<PatchOutcome> {
    match strategy {
        PatchStrategy::Structural => {
            structural::patch(file, &whitespace::encode(source), mismatches)
        }
        PatchStrategy::Splice => splice::patch(file, source, mismatches),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AssertionRecord;

    #[test]
    fn test_strategies_agree_on_simple_source() {
        let source = "// leading comment\n\n\nexpect(\"old\");\n\n// trailing\n";
        let mismatches = vec![AssertionRecord {
            call_site: CallSite::new("/t/a.ts", 4, 1),
            actual: "new".to_string(),
            expected: "old".to_string(),
        }];
        let expected = "// leading comment\n\n\nexpect(\"new\");\n\n// trailing\n";

        for strategy in [PatchStrategy::Structural, PatchStrategy::Splice] {
            let outcome = apply(strategy, Path::new("a.ts"), source, &mismatches).unwrap();
            assert_eq!(outcome.text, expected, "{strategy:?}");
        }
    }
}
