use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};

use super::source::{FrameBuffer, FrameSource, SymphoniaSource, Track};
use crate::error::{Result, VisualizerError};

/// Something that plays the track alongside the visualization.
pub trait Playback {
    /// Starts playback. Calling it again while playing has no effect.
    fn play(&mut self) -> Result<()>;

    fn stop(&mut self);
}

/// Plays a fully decoded track on the default output device.
pub struct AudioPlayer {
    stream: cpal::Stream,
    playing: bool,
    position: Arc<AtomicUsize>,
    total_frames: usize,
}

impl AudioPlayer {
    pub fn load(path: &Path) -> Result<Self> {
        let mut source = SymphoniaSource::open(path)?;
        let track = source.track();
        let samples = decode_all(&mut source)?;
        Self::from_samples(track, samples)
    }

    pub fn from_samples(track: Track, samples: Vec<f32>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| VisualizerError::setup("no audio output device found"))?;

        let config = pick_config(&device, &track)?;
        let out_channels = config.channels as usize;

        log::info!(
            "Audio: {} @ {}Hz, {} channel(s)",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate.0,
            out_channels
        );
        if config.sample_rate.0 != track.sample_rate {
            log::warn!(
                "Device runs at {}Hz, track is {}Hz; playback speed will differ from the visuals",
                config.sample_rate.0,
                track.sample_rate
            );
        }

        let src_channels = track.channels.max(1);
        let total_frames = samples.len() / src_channels;
        let samples = Arc::new(samples);
        let position = Arc::new(AtomicUsize::new(0));
        let cursor = Arc::clone(&position);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut frame = cursor.load(Ordering::Relaxed);
                    for out in data.chunks_mut(out_channels) {
                        if frame >= total_frames {
                            out.fill(0.0);
                            continue;
                        }
                        let input = &samples[frame * src_channels..(frame + 1) * src_channels];
                        map_channels(input, out);
                        frame += 1;
                    }
                    cursor.store(frame, Ordering::Relaxed);
                },
                |err| log::error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| VisualizerError::setup(format!("failed to build audio stream: {e}")))?;

        Ok(Self {
            stream,
            playing: false,
            position,
            total_frames,
        })
    }

    /// Frames handed to the device so far.
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.position() >= self.total_frames
    }
}

impl Playback for AudioPlayer {
    fn play(&mut self) -> Result<()> {
        if self.playing {
            return Ok(());
        }
        self.stream
            .play()
            .map_err(|e| VisualizerError::setup(format!("failed to start playback: {e}")))?;
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        if !self.playing {
            return;
        }
        if let Err(e) = self.stream.pause() {
            log::warn!("Failed to stop playback: {}", e);
        }
        self.playing = false;
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Decodes the remainder of `source` into one interleaved vector.
pub fn decode_all(source: &mut dyn FrameSource) -> Result<Vec<f32>> {
    let track = source.track();
    let mut buf = FrameBuffer::new(4096, track.channels);
    let mut all = Vec::with_capacity(
        track.total_frames.unwrap_or(0) as usize * track.channels,
    );
    while source.read_buffer(&mut buf)? > 0 {
        all.extend_from_slice(buf.samples());
    }
    Ok(all)
}

/// Spreads one source frame over the device channels. A mono device gets the average.
fn map_channels(input: &[f32], out: &mut [f32]) {
    if out.len() == 1 {
        out[0] = input.iter().sum::<f32>() / input.len() as f32;
        return;
    }
    for (c, slot) in out.iter_mut().enumerate() {
        *slot = input[c % input.len()];
    }
}

/// Prefers an f32 config at the track's rate and channel count, else the device default.
fn pick_config(device: &cpal::Device, track: &Track) -> Result<StreamConfig> {
    let rate = SampleRate(track.sample_rate);
    let matching = device
        .supported_output_configs()
        .map(|configs| {
            configs
                .filter(|c| c.sample_format() == SampleFormat::F32)
                .filter(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
                .max_by_key(|c| c.channels() as usize == track.channels)
        })
        .ok()
        .flatten();

    if let Some(range) = matching {
        return Ok(range.with_sample_rate(rate).config());
    }

    let default = device
        .default_output_config()
        .map_err(|e| VisualizerError::setup(format!("failed to get audio config: {e}")))?;
    if default.sample_format() != SampleFormat::F32 {
        return Err(VisualizerError::setup(format!(
            "audio device does not support f32 output (default is {:?})",
            default.sample_format()
        )));
    }
    Ok(default.config())
}
