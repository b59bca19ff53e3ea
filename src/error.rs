use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VisualizerError>;

#[derive(Debug, Error)]
pub enum VisualizerError {
    /// Window, GPU, audio device or transform plan could not be created.
    #[error("setup failed: {0}")]
    Setup(String),

    #[error("FFT size must be a non-zero power of two, got {0}")]
    InvalidFftSize(usize),

    #[error("unable to open input file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The track opened fine but a later read failed (distinct from end of stream).
    #[error("failed to read track: {0}")]
    Read(String),

    #[error("analysis needs {expected} frames, got {got}")]
    ShortBuffer { expected: usize, got: usize },

    #[error("unable to close input: {0}")]
    Shutdown(String),
}

impl VisualizerError {
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }
}

impl From<symphonia::core::errors::Error> for VisualizerError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        Self::Read(err.to_string())
    }
}
