use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Result, VisualizerError};

/// Immutable description of an opened audio track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Track {
    pub sample_rate: u32,
    pub channels: usize,
    /// Total frame count, when the container reports one.
    pub total_frames: Option<u64>,
}

impl Track {
    pub fn duration_secs(&self) -> Option<f64> {
        self.total_frames
            .map(|n| n as f64 / self.sample_rate as f64)
    }
}

/// Fixed-capacity interleaved sample buffer, refilled by every read.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    samples: Vec<f32>,
    channels: usize,
    capacity: usize,
    frames: usize,
}

impl FrameBuffer {
    pub fn new(capacity: usize, channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            samples: vec![0.0; capacity * channels],
            channels,
            capacity,
            frames: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames written by the last read.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn is_full(&self) -> bool {
        self.frames == self.capacity
    }

    /// Interleaved samples written by the last read.
    pub fn samples(&self) -> &[f32] {
        &self.samples[..self.frames * self.channels]
    }

    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        if index >= self.frames {
            return None;
        }
        let start = index * self.channels;
        Some(&self.samples[start..start + self.channels])
    }

    pub fn clear(&mut self) {
        self.frames = 0;
    }

    /// Appends whole frames from `interleaved` until the buffer is full.
    /// Returns the number of samples consumed.
    pub fn push_frames(&mut self, interleaved: &[f32]) -> usize {
        let room = self.capacity - self.frames;
        let frames = (interleaved.len() / self.channels).min(room);
        let count = frames * self.channels;
        let start = self.frames * self.channels;
        self.samples[start..start + count].copy_from_slice(&interleaved[..count]);
        self.frames += frames;
        count
    }
}

pub trait FrameSource {
    fn track(&self) -> Track;

    /// Reads up to `buf.capacity()` frames, replacing the buffer contents.
    /// Fewer frames only at end of stream; `Ok(0)` once the track is exhausted.
    fn read_buffer(&mut self, buf: &mut FrameBuffer) -> Result<usize>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct SymphoniaSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    track: Track,
    pending: Vec<f32>,
    cursor: usize,
    exhausted: bool,
}

impl SymphoniaSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|source| VisualizerError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| VisualizerError::Read(format!("failed to probe audio format: {e}")))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| VisualizerError::Read("no audio tracks found".into()))?;

        let track_id = track.id;
        let channels = track.codec_params.channels.map_or(1, |c| c.count());
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| VisualizerError::Read("unknown sample rate".into()))?;
        let total_frames = track.codec_params.n_frames;

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| VisualizerError::setup(format!("failed to create audio decoder: {e}")))?;

        let track = Track {
            sample_rate,
            channels,
            total_frames,
        };

        log::info!(
            "Opened {}: {}Hz, {} channel(s), {}",
            path.display(),
            sample_rate,
            channels,
            track
                .duration_secs()
                .map_or_else(|| "unknown length".to_string(), |d| format!("{d:.1}s")),
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            track,
            pending: Vec::new(),
            cursor: 0,
            exhausted: false,
        })
    }

    /// Decodes the next packet of our track into `pending`. Returns false at end of stream.
    fn decode_next(&mut self) -> Result<bool> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(msg)) => {
                    log::debug!("Skipping undecodable packet: {}", msg);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            if spec.channels.count() != self.track.channels {
                return Err(VisualizerError::Read(format!(
                    "decoded {} channel(s), track declared {}",
                    spec.channels.count(),
                    self.track.channels
                )));
            }

            let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);

            self.pending.clear();
            self.pending.extend_from_slice(sample_buf.samples());
            self.cursor = 0;

            if !self.pending.is_empty() {
                return Ok(true);
            }
        }
    }
}

impl FrameSource for SymphoniaSource {
    fn track(&self) -> Track {
        self.track
    }

    fn read_buffer(&mut self, buf: &mut FrameBuffer) -> Result<usize> {
        buf.clear();
        loop {
            if self.cursor < self.pending.len() {
                self.cursor += buf.push_frames(&self.pending[self.cursor..]);
            }
            if buf.is_full() || self.exhausted {
                break;
            }
            if !self.decode_next()? {
                self.exhausted = true;
            }
        }
        Ok(buf.frames())
    }
}

/// Track held entirely in memory.
pub struct MemorySource {
    track: Track,
    samples: Vec<f32>,
    position: usize,
}

impl MemorySource {
    pub fn new(sample_rate: u32, channels: usize, samples: Vec<f32>) -> Self {
        let channels = channels.max(1);
        let total_frames = (samples.len() / channels) as u64;
        Self {
            track: Track {
                sample_rate,
                channels,
                total_frames: Some(total_frames),
            },
            samples,
            position: 0,
        }
    }

    /// Frames consumed so far.
    pub fn position(&self) -> usize {
        self.position / self.track.channels
    }
}

impl FrameSource for MemorySource {
    fn track(&self) -> Track {
        self.track
    }

    fn read_buffer(&mut self, buf: &mut FrameBuffer) -> Result<usize> {
        buf.clear();
        self.position += buf.push_frames(&self.samples[self.position..]);
        Ok(buf.frames())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_frames_stops_at_capacity() {
        let mut buf = FrameBuffer::new(3, 2);
        let consumed = buf.push_frames(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(consumed, 6);
        assert!(buf.is_full());
        assert_eq!(buf.samples(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buf.frame(1), Some(&[3.0, 4.0][..]));
        assert_eq!(buf.frame(3), None);
    }

    #[test]
    fn test_push_frames_ignores_partial_frame() {
        let mut buf = FrameBuffer::new(4, 2);
        assert_eq!(buf.push_frames(&[1.0, 2.0, 3.0]), 2);
        assert_eq!(buf.frames(), 1);
    }

    #[test]
    fn test_memory_source_short_then_empty_read() {
        let mut source = MemorySource::new(44100, 1, vec![0.5; 10]);
        let mut buf = FrameBuffer::new(4, 1);

        assert_eq!(source.read_buffer(&mut buf).unwrap(), 4);
        assert_eq!(source.read_buffer(&mut buf).unwrap(), 4);
        assert_eq!(source.read_buffer(&mut buf).unwrap(), 2);
        assert_eq!(buf.samples().len(), 2);
        assert_eq!(source.read_buffer(&mut buf).unwrap(), 0);
        assert_eq!(source.position(), 10);
    }

    #[test]
    fn test_track_duration() {
        let source = MemorySource::new(48000, 2, vec![0.0; 96000]);
        assert_eq!(source.track().total_frames, Some(48000));
        assert_eq!(source.track().duration_secs(), Some(1.0));
    }
}
