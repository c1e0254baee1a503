//! Marker wire format
//!
//! An instrumented assertion reports over the test program's stdout:
//! ```text
//! ExpectTestMarker1\n
//! <expected-literal-text>\n
//! ExpectTestMarker2:<absoluteFilePath>:<line>:<column>\n
//! ```
//! Everything the program printed since the previous marker-2 is the
//! assertion's actual value.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Sentinel opening an assertion report
pub const MARKER_1: &str = "ExpectTestMarker1";

/// Prefix of the line closing an assertion report
pub const MARKER_2_PREFIX: &str = "ExpectTestMarker2:";

/// Environment variable the harness sets to "true" for the test program
pub const ENV_FLAG: &str = "EXPECT_TEST";

// File paths may themselves contain ':' (Windows drive letters), so the
// file group is greedy and the two numeric groups anchor at the end.
static MARKER_2_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ExpectTestMarker2:(.+):(\d+):(\d+)$").expect("marker-2 pattern is valid")
});

/// Source location of one assertion invocation, 1-based
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CallSite {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl CallSite {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// A line of test program output, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// `ExpectTestMarker1`
    Open,
    /// `ExpectTestMarker2:<file>:<line>:<column>`
    Close(CallSite),
}

impl Marker {
    /// Classify an output line
    ///
    /// Returns `None` for ordinary program output. A line that looks like a
    /// marker-2 but whose numbers do not fit is also `None`; the collector
    /// reports it separately.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line == MARKER_1 {
            return Some(Self::Open);
        }
        let caps = MARKER_2_REGEX.captures(line)?;
        let line_no = caps[2].parse().ok()?;
        let column = caps[3].parse().ok()?;
        Some(Self::Close(CallSite::new(&caps[1], line_no, column)))
    }

    /// Whether a line claims to be a marker-2, well-formed or not
    pub fn looks_like_close(line: &str) -> bool {
        line.starts_with(MARKER_2_PREFIX)
    }
}

/// Format the closing marker line (without trailing newline)
pub fn close_line(site: &CallSite) -> String {
    format!("{MARKER_2_PREFIX}{site}")
}

/// Instrumentation mode handed to assertion calls
///
/// The mode is an explicit value rather than process-wide state, so the
/// same assertion code runs with or without the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrumentation {
    pub enabled: bool,
}

impl Instrumentation {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Report an assertion at an explicit call-site
    ///
    /// Does nothing when instrumentation is disabled.
    pub fn report<W: Write>(&self, out: &mut W, expected: &str, site: &CallSite) -> io::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        writeln!(out, "{MARKER_1}")?;
        writeln!(out, "{expected}")?;
        writeln!(out, "{}", close_line(site))?;
        out.flush()
    }

    /// Report an assertion located at the caller of this function
    #[track_caller]
    pub fn expect<W: Write>(&self, out: &mut W, expected: &str) -> io::Result<()> {
        let caller = std::panic::Location::caller();
        let site = CallSite::new(
            crate::common::paths::resolve(std::path::Path::new(caller.file())),
            caller.line() as usize,
            caller.column() as usize,
        );
        self.report(out, expected, &site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_open_marker() {
        assert_eq!(Marker::parse("ExpectTestMarker1"), Some(Marker::Open));
        assert_eq!(Marker::parse("ExpectTestMarker1\r"), Some(Marker::Open));
        assert_eq!(Marker::parse(" ExpectTestMarker1"), None);
    }

    #[test]
    fn test_parse_close_marker() {
        let marker = Marker::parse("ExpectTestMarker2:/home/u/test.ts:11:5").unwrap();
        assert_eq!(marker, Marker::Close(CallSite::new("/home/u/test.ts", 11, 5)));
    }

    #[test]
    fn test_parse_close_marker_with_drive_letter() {
        let marker = Marker::parse(r"ExpectTestMarker2:C:\work\test.ts:3:9").unwrap();
        assert_eq!(marker, Marker::Close(CallSite::new(r"C:\work\test.ts", 3, 9)));
    }

    #[test]
    fn test_ordinary_output_is_not_a_marker() {
        assert_eq!(Marker::parse("11"), None);
        assert_eq!(Marker::parse("ExpectTestMarker2:missing-numbers"), None);
        assert!(Marker::looks_like_close("ExpectTestMarker2:missing-numbers"));
    }

    #[test]
    fn test_report_writes_three_part_sequence() {
        let mut out = Vec::new();
        let site = CallSite::new("/p/t.ts", 4, 2);
        Instrumentation::new(true)
            .report(&mut out, "line one\nline two", &site)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ExpectTestMarker1\nline one\nline two\nExpectTestMarker2:/p/t.ts:4:2\n"
        );
    }

    #[test]
    fn test_disabled_instrumentation_emits_nothing() {
        let mut out = Vec::new();
        Instrumentation::new(false).expect(&mut out, "anything").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_expect_reports_own_call_site() {
        let mut out = Vec::new();
        let line = line!() + 1;
        Instrumentation::new(true).expect(&mut out, "x").unwrap();

        let text = String::from_utf8(out).unwrap();
        let last = text.lines().last().unwrap();
        match Marker::parse(last) {
            Some(Marker::Close(site)) => {
                assert_eq!(site.line, line as usize);
                assert!(site.file.ends_with("marker.rs"));
            }
            other => panic!("Expected close marker, got {other:?}"),
        }
    }
}
