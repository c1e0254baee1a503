//! Line/column to byte offset conversion
//!
//! Built once from the text the call-sites refer to and never rebuilt from
//! patched text.

/// Byte offsets of every line start in a text
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            starts,
            len: text.len(),
        }
    }

    /// Byte range of a 1-based line, excluding its newline
    pub fn line_range(&self, line: usize) -> Option<std::ops::Range<usize>> {
        let start = *self.starts.get(line.checked_sub(1)?)?;
        let end = self.starts.get(line).map_or(self.len, |next| next - 1);
        Some(start..end)
    }

    /// Byte offset of a 1-based line and 1-based column
    ///
    /// Columns count UTF-16 code units, as JavaScript runtimes report them.
    /// A column past the end of the line clamps to the line end.
    pub fn offset(&self, text: &str, line: usize, column: usize) -> Option<usize> {
        let range = self.line_range(line)?;
        let target = column.saturating_sub(1);
        let mut units = 0;
        for (i, ch) in text[range.clone()].char_indices() {
            if units >= target {
                return Some(range.start + i);
            }
            units += ch.len_utf16();
        }
        Some(range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_ranges() {
        let text = "ab\ncd\n\nef";
        let index = LineIndex::new(text);
        assert_eq!(index.line_range(1), Some(0..2));
        assert_eq!(index.line_range(2), Some(3..5));
        assert_eq!(index.line_range(3), Some(6..6));
        assert_eq!(index.line_range(4), Some(7..9));
        assert_eq!(index.line_range(0), None);
        assert_eq!(index.line_range(5), None);
    }

    #[test]
    fn test_offset_ascii() {
        let text = "let a = 1;\n    expect(\"x\");\n";
        let index = LineIndex::new(text);
        let offset = index.offset(text, 2, 5).unwrap();
        assert!(text[offset..].starts_with("expect"));
    }

    #[test]
    fn test_offset_counts_utf16_units() {
        // '😀' is two UTF-16 units and four bytes
        let text = "😀 expect(\"x\")";
        let index = LineIndex::new(text);
        let offset = index.offset(text, 1, 4).unwrap();
        assert!(text[offset..].starts_with("expect"));
    }

    #[test]
    fn test_offset_clamps_to_line_end() {
        let text = "ab\ncd";
        let index = LineIndex::new(text);
        assert_eq!(index.offset(text, 1, 99), Some(2));
        assert_eq!(index.offset(text, 3, 1), None);
    }
}
