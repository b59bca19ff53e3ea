use clap::Parser;
use std::path::PathBuf;

use barscope::audio::DEFAULT_FFT_SIZE;
use barscope::layout::BarMode;

#[derive(Parser, Debug)]
#[command(name = "barscope", version, about = "Real-time frequency bar visualizer for audio files")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Samples per analysis buffer (power of two)
    #[arg(long, default_value_t = DEFAULT_FFT_SIZE)]
    pub fft_size: usize,

    /// Window width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Bar mesh: flat quads or shaded cubes
    #[arg(long, value_enum, default_value_t = BarMode::Flat)]
    pub mode: BarMode,

    /// Bar height per unit of FFT magnitude
    #[arg(long, default_value_t = 1.0)]
    pub gain: f32,

    /// Visualize without playing the audio
    #[arg(long)]
    pub no_audio: bool,

    /// Hide the terminal progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Config file (defaults to barscope.toml or ~/.config/barscope/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
