//! Reconstruct assertion records from buffered test program output
//!
//! The scan needs lookback: an assertion's actual value is only delimited
//! once its marker-1 shows up, so this runs over the complete output of a
//! finished run rather than a live stream.

use serde::Serialize;

use super::marker::{CallSite, Marker};
use crate::common::{Error, Result};

/// One observed assertion invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionRecord {
    pub call_site: CallSite,
    /// Program output since the previous assertion
    pub actual: String,
    /// Literal the assertion was called with
    pub expected: String,
}

impl AssertionRecord {
    pub fn is_mismatch(&self) -> bool {
        self.actual != self.expected
    }
}

#[derive(Debug, Clone, Copy)]
enum ScanState {
    AwaitingMarker1,
    AwaitingMarker2 { marker1: usize },
}

/// Scan one run's stdout lines into assertion records, in execution order
pub fn collect<S: AsRef<str>>(lines: &[S]) -> Result<Vec<AssertionRecord>> {
    let mut records = Vec::new();
    let mut state = ScanState::AwaitingMarker1;
    let mut last_boundary = 0;

    for (index, raw) in lines.iter().enumerate() {
        let line = raw.as_ref();
        match (Marker::parse(line), state) {
            (Some(Marker::Open), ScanState::AwaitingMarker1) => {
                state = ScanState::AwaitingMarker2 { marker1: index };
            }
            (Some(Marker::Open), ScanState::AwaitingMarker2 { .. }) => {
                return Err(Error::protocol(
                    index + 1,
                    "marker-1 while a previous marker-1 is still open",
                    line,
                ));
            }
            (Some(Marker::Close(_)), ScanState::AwaitingMarker1) => {
                return Err(Error::protocol(
                    index + 1,
                    "marker-2 with no preceding marker-1",
                    line,
                ));
            }
            (Some(Marker::Close(call_site)), ScanState::AwaitingMarker2 { marker1 }) => {
                records.push(AssertionRecord {
                    call_site,
                    actual: join_trimmed(&lines[last_boundary..marker1]),
                    expected: join_trimmed(&lines[marker1 + 1..index]),
                });
                last_boundary = index + 1;
                state = ScanState::AwaitingMarker1;
            }
            (None, ScanState::AwaitingMarker2 { .. }) if Marker::looks_like_close(line) => {
                return Err(Error::protocol(index + 1, "malformed marker-2 line", line));
            }
            (None, _) => {}
        }
    }

    if let ScanState::AwaitingMarker2 { marker1 } = state {
        return Err(Error::protocol(
            marker1 + 1,
            "marker-1 with no following marker-2",
            lines[marker1].as_ref(),
        ));
    }

    tracing::debug!(count = records.len(), "Collected assertion records");
    Ok(records)
}

/// Join lines with '\n', dropping leading and trailing blank lines
fn join_trimmed<S: AsRef<str>>(lines: &[S]) -> String {
    let is_blank = |s: &S| s.as_ref().trim().is_empty();
    let start = lines.iter().position(|l| !is_blank(l)).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !is_blank(l)).map_or(start, |i| i + 1);
    lines[start..end]
        .iter()
        .map(|l| l.as_ref().strip_suffix('\r').unwrap_or(l.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}
