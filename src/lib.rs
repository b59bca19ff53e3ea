//! Real-time frequency bar visualizer.
//!
//! Frames are read from a track one FFT-sized buffer at a time, down-mixed,
//! Hamming-windowed and transformed, then drawn as one bar per bin. Each
//! iteration is paced to the wall-clock length of its buffer so the bars keep
//! up with playback.

pub mod audio;
pub mod config;
pub mod error;
pub mod layout;
pub mod pacing;
pub mod render;
pub mod visualizer;

pub use error::{Result, VisualizerError};
pub use visualizer::{LoopOutcome, StopReason, Visualizer};
