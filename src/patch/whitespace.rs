//! Blank-line preservation codec
//!
//! Reprinting a syntax tree tends to collapse blank lines. Before parsing,
//! every empty line is replaced by a sentinel comment; after printing the
//! sentinels turn back into empty lines. The encoding never adds or removes
//! a line, so call-site line numbers stay valid against either form.
//!
//! The structural patcher never reprints the tree: it splices new argument
//! lists into the encoded text, so there `decode(encode(text))` is the
//! identity outside the edited ranges. The codec only matters for a step
//! that prints the whole tree back out.

/// Comment standing in for an empty line
pub const SENTINEL: &str = "/** EXPECT_TEST_BLANK_LINE **/";

/// Replace each empty line with [`SENTINEL`]
pub fn encode(text: &str) -> String {
    let segments: Vec<&str> = text.split('\n').collect();
    let last = segments.len() - 1;
    segments
        .iter()
        .enumerate()
        .map(|(i, line)| match *line {
            // The segment after a final newline is end of text, not a line.
            "" if i == last => String::new(),
            "" => SENTINEL.to_string(),
            "\r" => format!("{SENTINEL}\r"),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn every line consisting only of [`SENTINEL`] back into an empty line
pub fn decode(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            let (body, cr) = match line.strip_suffix('\r') {
                Some(body) => (body, "\r"),
                None => (line, ""),
            };
            if body.trim() == SENTINEL {
                cr.to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_replaces_blank_lines() {
        assert_eq!(encode("a\n\nb\n"), format!("a\n{SENTINEL}\nb\n"));
    }

    #[test]
    fn test_encode_handles_runs_of_blank_lines() {
        let encoded = encode("a\n\n\n\nb");
        assert_eq!(encoded, format!("a\n{SENTINEL}\n{SENTINEL}\n{SENTINEL}\nb"));
        assert!(!encoded.contains("\n\n"));
    }

    #[test]
    fn test_encode_preserves_line_count() {
        let text = "one\n\ntwo\n\n\nthree\n";
        assert_eq!(encode(text).lines().count(), text.lines().count());
    }

    #[test]
    fn test_round_trip() {
        for text in ["", "\n", "a", "a\n\n\nb\n", "\n\nlead", "x\r\n\r\ny\r\n", "  \n\n  "] {
            assert_eq!(decode(&encode(text)), text, "round trip of {text:?}");
        }
    }

    #[test]
    fn test_survives_printer_that_collapses_blank_lines() {
        fn collapse(text: &str) -> String {
            let mut out = text.to_string();
            while out.contains("\n\n") {
                out = out.replace("\n\n", "\n");
            }
            out
        }

        let text = "a();\n\n\nb();\n\nc();\n";
        assert_eq!(collapse(text), "a();\nb();\nc();\n");
        assert_eq!(decode(&collapse(&encode(text))), text);
    }

    #[test]
    fn test_decode_accepts_indented_sentinel() {
        let printed = format!("a\n    {SENTINEL}\nb");
        assert_eq!(decode(&printed), "a\n\nb");
    }

    #[test]
    fn test_decode_leaves_inline_sentinel_text() {
        let printed = format!("let s = \"{SENTINEL}\";");
        assert_eq!(decode(&printed), printed);
    }
}
