pub mod analyzer;
pub mod playback;
pub mod source;

pub use analyzer::{SpectralAnalyzer, DEFAULT_FFT_SIZE};
pub use playback::{AudioPlayer, Playback};
pub use source::{FrameBuffer, FrameSource, MemorySource, SymphoniaSource, Track};
