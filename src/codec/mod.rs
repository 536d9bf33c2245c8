//! Byte-stream interpretation for interactive sessions.
//!
//! There is no protocol framing on a device shell, so this layer supplies
//! the three heuristics that stand in for one: encoding fallback, timing
//! based completion detection, and textual output framing.

mod completion;
mod encoding;
mod framer;

pub use completion::{Capture, CompletionCause, CompletionProfile, collect_output};
pub use encoding::{decode_capture, encode_command};
pub use framer::frame_output;
