use std::ops::RangeInclusive;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::source::FrameBuffer;
use crate::error::{Result, VisualizerError};

pub const DEFAULT_FFT_SIZE: usize = 2048;

/// Fixed-size windowed FFT over down-mixed frames.
///
/// The plan, window and both working buffers are created once and reused for
/// every call to [`SpectralAnalyzer::analyze`]. Output is the raw DFT, with no
/// normalization applied.
pub struct SpectralAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    mono: Vec<f32>,
    bins: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectralAnalyzer {
    pub fn new(fft_size: usize) -> Result<Self> {
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(VisualizerError::InvalidFftSize(fft_size));
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        log::debug!("Planned forward FFT of size {}", fft_size);

        Ok(Self {
            fft,
            fft_size,
            window: hamming_window(fft_size),
            mono: vec![0.0; fft_size],
            bins: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Bins drawn by the visualizer: DC excluded, Nyquist included.
    pub fn usable_bins(&self) -> RangeInclusive<usize> {
        1..=self.fft_size / 2
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Down-mixes, windows and transforms the first `fft_size` frames of `frames`.
    pub fn analyze(&mut self, frames: &FrameBuffer) -> Result<&[Complex<f32>]> {
        self.analyze_interleaved(frames.samples(), frames.channels())
    }

    pub fn analyze_interleaved(
        &mut self,
        samples: &[f32],
        channels: usize,
    ) -> Result<&[Complex<f32>]> {
        let channels = channels.max(1);
        let got = samples.len() / channels;
        if got < self.fft_size {
            return Err(VisualizerError::ShortBuffer {
                expected: self.fft_size,
                got,
            });
        }

        downmix(&samples[..self.fft_size * channels], channels, &mut self.mono);

        for ((bin, &amp), &w) in self.bins.iter_mut().zip(&self.mono).zip(&self.window) {
            *bin = Complex::new(amp * w, 0.0);
        }

        self.fft.process_with_scratch(&mut self.bins, &mut self.scratch);

        Ok(&self.bins)
    }

    /// Magnitudes of the usable bins, lowest frequency first.
    pub fn magnitudes(&self) -> impl Iterator<Item = f32> + '_ {
        self.bins[self.usable_bins()].iter().map(|c| magnitude(*c))
    }

    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.fft_size as f32
    }
}

/// Averages each interleaved frame into one mono amplitude.
///
/// Identical channels average back to exactly the input amplitude.
pub fn downmix(samples: &[f32], channels: usize, out: &mut [f32]) {
    if channels == 1 {
        let n = out.len().min(samples.len());
        out[..n].copy_from_slice(&samples[..n]);
        return;
    }
    for (slot, frame) in out.iter_mut().zip(samples.chunks_exact(channels)) {
        let sum: f64 = frame.iter().map(|&s| s as f64).sum();
        *slot = (sum / channels as f64) as f32;
    }
}

pub fn hamming_window(size: usize) -> Vec<f32> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| {
            0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos()
        })
        .collect()
}

pub fn magnitude(c: Complex<f32>) -> f32 {
    (c.re * c.re + c.im * c.im).sqrt()
}
