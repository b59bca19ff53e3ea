use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use crate::audio::{FrameBuffer, FrameSource, Playback, SpectralAnalyzer, Track};
use crate::error::Result;
use crate::layout::{BarLayout, BarStyle, TransformStack, Viewport};
use crate::pacing::PacingClock;
use crate::render::Canvas;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The source ran out of full buffers.
    Exhausted,
    CloseRequested,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Buffers analysed and drawn.
    pub iterations: u64,
    pub reason: StopReason,
}

/// Read → analyze → layout → draw → pace, once per buffer of audio.
pub struct Visualizer {
    analyzer: SpectralAnalyzer,
    layout: BarLayout,
    frames: FrameBuffer,
    pacing: PacingClock,
    stack: TransformStack,
    progress: Option<ProgressBar>,
}

impl Visualizer {
    pub fn new(track: Track, fft_size: usize, style: BarStyle, viewport: Viewport) -> Result<Self> {
        let analyzer = SpectralAnalyzer::new(fft_size)?;
        let layout = BarLayout::new(fft_size, viewport, style);
        let stack = TransformStack::new(layout.base_view());

        Ok(Self {
            analyzer,
            layout,
            frames: FrameBuffer::new(fft_size, track.channels),
            pacing: PacingClock::new(fft_size, track.sample_rate),
            stack,
            progress: None,
        })
    }

    /// Shows a terminal progress bar while running.
    pub fn with_progress(mut self, total_frames: Option<u64>) -> Self {
        let pb = match total_frames {
            Some(total) => {
                let pb = ProgressBar::new(total);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames")
                {
                    pb.set_style(style.progress_chars("=>-"));
                }
                pb
            }
            None => ProgressBar::new_spinner(),
        };
        self.progress = Some(pb);
        self
    }

    pub fn pacing(&self) -> &PacingClock {
        &self.pacing
    }

    pub fn analyzer(&self) -> &SpectralAnalyzer {
        &self.analyzer
    }

    /// Runs until the source is exhausted or the canvas asks to close.
    ///
    /// Playback is started once before the first iteration and stopped on every
    /// exit path. The source is closed afterwards; a close failure is reported
    /// only if the loop itself succeeded.
    pub fn run<S, C>(
        &mut self,
        source: &mut S,
        canvas: &mut C,
        mut player: Option<&mut dyn Playback>,
    ) -> Result<LoopOutcome>
    where
        S: FrameSource + ?Sized,
        C: Canvas + ?Sized,
    {
        if let Some(player) = player.as_mut() {
            player.play()?;
        }

        let result = self.drive(source, canvas);

        if let Some(player) = player.as_mut() {
            player.stop();
        }
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
        let closed = source.close();

        let outcome = result?;
        closed?;

        log::info!(
            "Stopped after {} buffer(s): {:?}",
            outcome.iterations,
            outcome.reason
        );
        Ok(outcome)
    }

    fn drive<S, C>(&mut self, source: &mut S, canvas: &mut C) -> Result<LoopOutcome>
    where
        S: FrameSource + ?Sized,
        C: Canvas + ?Sized,
    {
        let mut iterations = 0u64;
        let mut deadline = Instant::now();

        loop {
            if canvas.poll_close_requested() {
                return Ok(LoopOutcome {
                    iterations,
                    reason: StopReason::CloseRequested,
                });
            }

            let read = source.read_buffer(&mut self.frames)?;
            if read < self.frames.capacity() {
                if read > 0 {
                    log::debug!(
                        "Final read returned {} of {} frames, not analysed",
                        read,
                        self.frames.capacity()
                    );
                }
                return Ok(LoopOutcome {
                    iterations,
                    reason: StopReason::Exhausted,
                });
            }

            self.analyzer.analyze(&self.frames)?;

            let viewport = canvas.viewport();
            if viewport != self.layout.viewport() {
                self.layout.set_viewport(viewport);
            }

            let depth = self.stack.depth();
            canvas.begin_frame();
            self.layout.layout_bars(
                &mut self.stack,
                self.analyzer.magnitudes(),
                |model_view, color| canvas.draw_mesh(model_view, color),
            );
            debug_assert_eq!(self.stack.depth(), depth);
            canvas.present()?;

            iterations += 1;
            if let Some(pb) = &self.progress {
                pb.inc(read as u64);
            }

            deadline = self.pacing.next_deadline(deadline);
            self.pacing.wait_until(deadline);
        }
    }
}
