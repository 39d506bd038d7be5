//! povtrim Cut Engine
//!
//! Drives ffprobe and ffmpeg to turn a keep-segment plan into one
//! trimmed video without re-encoding wherever a keyframe is close enough.
//!
//! # Pipeline
//!
//! ```text
//! keep segments ──► validate ──► probe duration + keyframes
//!                                        │
//!                                        ▼
//!                          snap to keyframes (copy / re-encode)
//!                                        │
//!                                        ▼
//!                 extract segment_0000.mp4 … segment_NNNN.mp4
//!                                        │
//!                                        ▼
//!                              concat demuxer ──► output.mp4
//! ```
//!
//! Every external process runs under the remaining share of one overall
//! deadline and is killed when it expires.

pub mod cut;
pub mod ffmpeg;
pub mod probe;
pub mod process;
pub mod workspace;

pub use cut::*;
pub use ffmpeg::{tool_version, FfmpegBackend};
pub use process::Deadline;
