//! Marker protocol between instrumented assertions and the harness
//!
//! The test program is the producer: each assertion prints its marker
//! sequence to stdout. The harness buffers the whole output and scans it
//! afterwards with [`collect`].

mod collector;
mod marker;

pub use collector::{collect, AssertionRecord};
pub use marker::{close_line, CallSite, Instrumentation, Marker, ENV_FLAG, MARKER_1, MARKER_2_PREFIX};
