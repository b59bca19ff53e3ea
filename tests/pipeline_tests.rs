//! Integration tests for the read → analyze → layout → draw loop.

use barscope::audio::{FrameBuffer, FrameSource, MemorySource, Playback, SpectralAnalyzer, Track};
use barscope::layout::{BarStyle, Viewport};
use barscope::render::Canvas;
use barscope::{LoopOutcome, Result, StopReason, Visualizer, VisualizerError};
use glam::Mat4;

const SAMPLE_RATE: u32 = 44100;
const FFT_SIZE: usize = 256;

#[derive(Default)]
struct RecordingCanvas {
    polls: usize,
    close_after_polls: Option<usize>,
    frames: Vec<Vec<(Mat4, [f32; 4])>>,
    current: Vec<(Mat4, [f32; 4])>,
}

impl Canvas for RecordingCanvas {
    fn poll_close_requested(&mut self) -> bool {
        self.polls += 1;
        self.close_after_polls
            .map_or(false, |limit| self.polls > limit)
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(800, 600)
    }

    fn begin_frame(&mut self) {
        self.current.clear();
    }

    fn draw_mesh(&mut self, model_view: &Mat4, color: [f32; 4]) {
        self.current.push((*model_view, color));
    }

    fn present(&mut self) -> Result<()> {
        self.frames.push(std::mem::take(&mut self.current));
        Ok(())
    }
}

#[derive(Default)]
struct CountingPlayer {
    plays: usize,
    stops: usize,
}

impl Playback for CountingPlayer {
    fn play(&mut self) -> Result<()> {
        self.plays += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

/// Wraps a source, failing reads after `fail_after` reads and optionally on close.
struct FlakySource {
    inner: MemorySource,
    reads: usize,
    fail_after: Option<usize>,
    fail_close: bool,
}

impl FrameSource for FlakySource {
    fn track(&self) -> Track {
        self.inner.track()
    }

    fn read_buffer(&mut self, buf: &mut FrameBuffer) -> Result<usize> {
        self.reads += 1;
        if self.fail_after.is_some_and(|n| self.reads > n) {
            return Err(VisualizerError::Read("device unplugged".into()));
        }
        self.inner.read_buffer(buf)
    }

    fn close(&mut self) -> Result<()> {
        if self.fail_close {
            Err(VisualizerError::Shutdown("close failed".into()))
        } else {
            Ok(())
        }
    }
}

fn impulse_track(frames: usize) -> MemorySource {
    let mut samples = vec![0.0; frames];
    samples[0] = 1.0;
    MemorySource::new(SAMPLE_RATE, 1, samples)
}

fn visualizer_for(source: &MemorySource) -> Visualizer {
    Visualizer::new(
        source.track(),
        FFT_SIZE,
        BarStyle::default(),
        Viewport::new(800, 600),
    )
    .unwrap()
}

#[test]
fn test_impulse_gives_flat_spectrum() {
    let mut source = impulse_track(SAMPLE_RATE as usize);
    let mut buf = FrameBuffer::new(FFT_SIZE, 1);
    assert_eq!(source.read_buffer(&mut buf).unwrap(), FFT_SIZE);

    let mut analyzer = SpectralAnalyzer::new(FFT_SIZE).unwrap();
    analyzer.analyze(&buf).unwrap();

    // Hamming coefficient at n = 0
    let expected = 0.08;
    let mags: Vec<f32> = analyzer.magnitudes().collect();
    assert_eq!(mags.len(), FFT_SIZE / 2);
    for (i, &m) in mags.iter().enumerate() {
        assert!(
            (m - expected).abs() < 1e-4,
            "bin {} magnitude {} not near {}",
            i + 1,
            m,
            expected
        );
    }
}

#[test]
fn test_stereo_downmix_matches_mono() {
    let mono: Vec<f32> = (0..FFT_SIZE).map(|i| ((i * 7) % 13) as f32 / 13.0 - 0.5).collect();
    let stereo: Vec<f32> = mono.iter().flat_map(|&s| [s, s]).collect();

    let mut a = SpectralAnalyzer::new(FFT_SIZE).unwrap();
    let mut b = SpectralAnalyzer::new(FFT_SIZE).unwrap();
    let from_mono = a.analyze_interleaved(&mono, 1).unwrap().to_vec();
    let from_stereo = b.analyze_interleaved(&stereo, 2).unwrap().to_vec();
    assert_eq!(from_mono, from_stereo);
}

#[test]
fn test_exactly_one_buffer_draws_once() {
    let mut source = impulse_track(FFT_SIZE);
    let mut visualizer = visualizer_for(&source);
    let mut canvas = RecordingCanvas::default();

    let outcome = visualizer.run(&mut source, &mut canvas, None).unwrap();

    assert_eq!(
        outcome,
        LoopOutcome {
            iterations: 1,
            reason: StopReason::Exhausted
        }
    );
    assert_eq!(canvas.frames.len(), 1);
    assert_eq!(canvas.frames[0].len(), FFT_SIZE / 2);
}

#[test]
fn test_partial_tail_is_not_analysed() {
    let mut source = impulse_track(FFT_SIZE * 2 + 100);
    let mut visualizer = visualizer_for(&source);
    let mut canvas = RecordingCanvas::default();

    let outcome = visualizer.run(&mut source, &mut canvas, None).unwrap();

    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.reason, StopReason::Exhausted);
    assert_eq!(canvas.frames.len(), 2);
    assert_eq!(source.position(), FFT_SIZE * 2 + 100);
}

#[test]
fn test_close_request_stops_loop_and_playback() {
    let mut source = impulse_track(FFT_SIZE * 50);
    let mut visualizer = visualizer_for(&source);
    let mut canvas = RecordingCanvas {
        close_after_polls: Some(3),
        ..Default::default()
    };
    let mut player = CountingPlayer::default();

    let outcome = visualizer
        .run(&mut source, &mut canvas, Some(&mut player as &mut dyn Playback))
        .unwrap();

    assert_eq!(outcome.reason, StopReason::CloseRequested);
    assert_eq!(outcome.iterations, 3);
    assert_eq!(source.position(), FFT_SIZE * 3);
    assert_eq!((player.plays, player.stops), (1, 1));
}

#[test]
fn test_read_error_is_fatal_and_still_stops_playback() {
    let mut source = FlakySource {
        inner: impulse_track(FFT_SIZE * 10),
        reads: 0,
        fail_after: Some(2),
        fail_close: false,
    };
    let mut visualizer = Visualizer::new(
        source.track(),
        FFT_SIZE,
        BarStyle::default(),
        Viewport::new(800, 600),
    )
    .unwrap();
    let mut canvas = RecordingCanvas::default();
    let mut player = CountingPlayer::default();

    let err = visualizer
        .run(&mut source, &mut canvas, Some(&mut player as &mut dyn Playback))
        .unwrap_err();

    assert!(matches!(err, VisualizerError::Read(_)));
    assert_eq!(canvas.frames.len(), 2);
    assert_eq!(player.stops, 1);
}

#[test]
fn test_close_failure_is_reported_after_clean_run() {
    let mut source = FlakySource {
        inner: impulse_track(FFT_SIZE),
        reads: 0,
        fail_after: None,
        fail_close: true,
    };
    let mut visualizer = Visualizer::new(
        source.track(),
        FFT_SIZE,
        BarStyle::default(),
        Viewport::new(800, 600),
    )
    .unwrap();
    let mut canvas = RecordingCanvas::default();

    let err = visualizer.run(&mut source, &mut canvas, None).unwrap_err();

    assert!(matches!(err, VisualizerError::Shutdown(_)));
    assert_eq!(canvas.frames.len(), 1);
}

#[test]
fn test_bars_share_base_and_track_magnitude() {
    let mut source = impulse_track(FFT_SIZE);
    let mut visualizer = visualizer_for(&source);
    let mut canvas = RecordingCanvas::default();
    visualizer.run(&mut source, &mut canvas, None).unwrap();

    let bars = &canvas.frames[0];
    let thickness = 800.0 / FFT_SIZE as f32;
    let style = BarStyle::default();
    let expected_height = style.base_height + style.gain * 0.08;

    for (i, (m, _)) in bars.iter().enumerate() {
        // Flat mode has an identity base, so columns hold scale and translation directly
        assert!((m.x_axis.x - thickness).abs() < 1e-4);
        assert!((m.y_axis.y - expected_height).abs() < 1e-3);
        let x = -400.0 + thickness + 2.0 * thickness * i as f32;
        assert!((m.w_axis.x - x).abs() < 1e-3, "bar {} at {}", i, m.w_axis.x);
    }
}

#[test]
fn test_loop_is_paced_to_buffer_duration() {
    let buffers = 8;
    let mut source = impulse_track(FFT_SIZE * buffers);
    let mut visualizer = visualizer_for(&source);
    let interval = visualizer.pacing().interval();
    let mut canvas = RecordingCanvas::default();

    let start = std::time::Instant::now();
    visualizer.run(&mut source, &mut canvas, None).unwrap();

    assert!(start.elapsed() >= interval * buffers as u32);
}
