//! Syntax-tree based patching
//!
//! The tree of the encoded original text is parsed once and never mutated.
//! Each mismatch is resolved against that tree to the argument list of the
//! innermost call expression containing its call-site, and becomes an edit
//! in a [`PatchPlan`]. Only those argument lists are rewritten; every other
//! byte of the source is carried over as-is.

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;

use tree_sitter::{Language, Parser, Tree};

use super::line_index::LineIndex;
use super::{literal, whitespace, PatchOutcome};
use crate::common::{Error, Result};
use crate::protocol::CallSite;
use crate::select::Mismatch;

/// Grammar for a file, chosen by extension
pub fn language_for(path: &Path) -> Language {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("tsx" | "jsx") => tree_sitter_typescript::LANGUAGE_TSX.into(),
        _ => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
    }
}

/// Parsed source plus the line table its call-sites refer to
pub struct SourceTree<'a> {
    text: &'a str,
    tree: Tree,
    index: LineIndex,
}

impl<'a> SourceTree<'a> {
    pub fn parse(file: &Path, text: &'a str) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&language_for(file))
            .map_err(|e| Error::Internal(format!("Failed to load grammar: {e}")))?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| Error::Internal(format!("Parser gave no tree for {}", file.display())))?;

        if tree.root_node().has_error() {
            tracing::warn!(file = %file.display(), "Source has syntax errors; patching best-effort");
        }

        Ok(Self {
            text,
            tree,
            index: LineIndex::new(text),
        })
    }

    /// Byte range of the argument list of the innermost call containing
    /// the 1-based `line`/`column`
    pub fn call_arguments_at(&self, line: usize, column: usize) -> Option<Range<usize>> {
        let offset = self.index.offset(self.text, line, column)?;
        let mut node = self.tree.root_node().descendant_for_byte_range(offset, offset);
        while let Some(current) = node {
            if current.kind() == "call_expression" {
                if let Some(arguments) = current.child_by_field_name("arguments") {
                    return Some(arguments.byte_range());
                }
            }
            node = current.parent();
        }
        None
    }
}

/// One replacement of a call's argument list
#[derive(Debug, Clone)]
pub struct Edit {
    pub range: Range<usize>,
    pub replacement: String,
    pub call_site: CallSite,
}

/// Accumulated edits, keyed by start offset in the original text
///
/// Adding an edit yields a new plan; an edit overlapping an earlier one
/// supersedes it (the last observed value at a call-site wins).
#[derive(Debug, Clone, Default)]
pub struct PatchPlan {
    edits: BTreeMap<usize, Edit>,
}

impl PatchPlan {
    pub fn with(mut self, edit: Edit) -> (Self, Vec<Edit>) {
        let overlapping: Vec<usize> = self
            .edits
            .values()
            .filter(|e| e.range.start < edit.range.end && edit.range.start < e.range.end)
            .map(|e| e.range.start)
            .collect();
        let superseded = overlapping
            .into_iter()
            .filter_map(|start| self.edits.remove(&start))
            .collect();
        self.edits.insert(edit.range.start, edit);
        (self, superseded)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Apply every edit to `text`, back to front so offsets stay valid
    pub fn render(&self, text: &str) -> String {
        let mut out = text.to_string();
        for edit in self.edits.values().rev() {
            out.replace_range(edit.range.clone(), &edit.replacement);
        }
        out
    }
}

/// Patch whitespace-encoded source; returns decoded text
pub fn patch(file: &Path, encoded: &str, mismatches: &[Mismatch]) -> Result<PatchOutcome> {
    let source = SourceTree::parse(file, encoded)?;
    let mut plan = PatchPlan::default();
    let mut superseded = Vec::new();

    for mismatch in mismatches {
        let site = &mismatch.call_site;
        let range = source
            .call_arguments_at(site.line, site.column)
            .ok_or_else(|| Error::PatchTargetNotFound {
                file: file.to_path_buf(),
                line: site.line,
                column: site.column,
            })?;

        let replacement = format!("({})", literal::render(&mismatch.actual));
        let (next, replaced) = plan.with(Edit {
            range,
            replacement: replacement.clone(),
            call_site: site.clone(),
        });
        plan = next;

        for old in replaced {
            if old.replacement != replacement {
                tracing::warn!(
                    call_site = %old.call_site,
                    "Call-site observed with differing values; keeping the last one"
                );
            }
            superseded.push(old.call_site);
        }
    }

    tracing::debug!(edits = plan.len(), file = %file.display(), "Rendering patched source");
    Ok(PatchOutcome {
        text: whitespace::decode(&plan.render(encoded)),
        applied: plan.len(),
        superseded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AssertionRecord;

    fn mismatch(line: usize, column: usize, actual: &str) -> Mismatch {
        AssertionRecord {
            call_site: CallSite::new("/t/test.ts", line, column),
            actual: actual.to_string(),
            expected: String::new(),
        }
    }

    fn run(source: &str, mismatches: &[Mismatch]) -> PatchOutcome {
        patch(Path::new("test.ts"), &whitespace::encode(source), mismatches).unwrap()
    }

    #[test]
    fn test_single_call_is_rewritten() {
        let source = "// header\nconsole.log(f());\nexpect(\"old\");\n\n\nconst x = 1;\n";
        let outcome = run(source, &[mismatch(3, 1, "new")]);
        assert_eq!(
            outcome.text,
            "// header\nconsole.log(f());\nexpect(\"new\");\n\n\nconst x = 1;\n"
        );
        assert_eq!(outcome.applied, 1);
    }

    #[test]
    fn test_column_inside_indented_member_call() {
        let source = "class A {\n  constructor(t: any) {\n    t.expect('1123');\n  }\n}\n";
        let outcome = run(source, &[mismatch(3, 7, "11")]);
        assert!(outcome.text.contains("    t.expect(\"11\");\n"));
    }

    #[test]
    fn test_innermost_call_wins() {
        let source = "wrap(expect(\"a\"), \"b\");\n";
        let outcome = run(source, &[mismatch(1, 6, "z")]);
        assert_eq!(outcome.text, "wrap(expect(\"z\"), \"b\");\n");
    }

    #[test]
    fn test_multiline_actual_becomes_template() {
        let source = "expect(\"a\");\n";
        let outcome = run(source, &[mismatch(1, 1, "line 1\nline 2")]);
        assert_eq!(outcome.text, "expect(`line 1\nline 2`);\n");
    }

    #[test]
    fn test_replaces_multiline_template_argument() {
        let source = "expect(`a\n\nb`);\nexpect(\"c\");\n";
        let outcome = run(source, &[mismatch(1, 1, "x"), mismatch(4, 1, "y")]);
        assert_eq!(outcome.text, "expect(\"x\");\nexpect(\"y\");\n");
    }

    #[test]
    fn test_blank_lines_inside_untouched_template_survive() {
        let source = "const t = `a\n\n\nb`;\nexpect(\"c\");\n";
        let outcome = run(source, &[mismatch(5, 1, "d")]);
        assert_eq!(outcome.text, "const t = `a\n\n\nb`;\nexpect(\"d\");\n");
    }

    #[test]
    fn test_out_of_order_mismatches() {
        let source = "expect(\"1\");\nexpect(\"2\");\nexpect(\"3\");\n";
        let outcome = run(source, &[mismatch(3, 1, "c"), mismatch(1, 1, "a")]);
        assert_eq!(outcome.text, "expect(\"a\");\nexpect(\"2\");\nexpect(\"c\");\n");
    }

    #[test]
    fn test_repeated_call_site_keeps_last_value() {
        let source = "for (const i of [1, 2, 3]) {\n  expect(\"0\");\n}\n";
        let outcome = run(
            source,
            &[mismatch(2, 3, "1"), mismatch(2, 3, "2"), mismatch(2, 3, "3")],
        );
        assert_eq!(outcome.text, "for (const i of [1, 2, 3]) {\n  expect(\"3\");\n}\n");
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.superseded.len(), 2);
    }

    #[test]
    fn test_position_outside_any_call_is_not_found() {
        let source = "const a = 1;\nexpect(\"x\");\n";
        let err = patch(Path::new("test.ts"), source, &[mismatch(1, 1, "y")]).unwrap_err();
        assert!(matches!(err, Error::PatchTargetNotFound { line: 1, column: 1, .. }));
    }

    #[test]
    fn test_line_past_end_is_not_found() {
        let err = patch(Path::new("test.ts"), "expect(\"x\");", &[mismatch(9, 1, "y")]).unwrap_err();
        assert!(matches!(err, Error::PatchTargetNotFound { line: 9, .. }));
    }

    #[test]
    fn test_no_mismatches_round_trips_blank_lines() {
        let source = "a();\n\n\n\nb();\n\n";
        let outcome = run(source, &[]);
        assert_eq!(outcome.text, source);
        assert_eq!(outcome.applied, 0);
    }

    #[test]
    fn test_tsx_grammar_for_tsx_files() {
        let source = "const el = <div>{expect(\"a\")}</div>;\n";
        let encoded = whitespace::encode(source);
        let outcome = patch(Path::new("view.tsx"), &encoded, &[mismatch(1, 18, "b")]).unwrap();
        assert_eq!(outcome.text, "const el = <div>{expect(\"b\")}</div>;\n");
    }

    #[test]
    fn test_plan_with_supersedes_overlapping_edit() {
        let site = CallSite::new("/t/a.ts", 1, 1);
        let edit = |range: Range<usize>, text: &str| Edit {
            range,
            replacement: text.to_string(),
            call_site: site.clone(),
        };
        let (plan, superseded) = PatchPlan::default().with(edit(4..8, "(1)"));
        assert!(superseded.is_empty());
        let (plan, superseded) = plan.with(edit(4..8, "(2)"));
        assert_eq!(superseded.len(), 1);
        let (plan, _) = plan.with(edit(10..12, "(3)"));
        assert_eq!(plan.render("abc (xx) y()!"), "abc (2) y(3)!");
    }
}
