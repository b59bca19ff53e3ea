mod cli;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;

use barscope::audio::{AudioPlayer, FrameSource, Playback, SymphoniaSource};
use barscope::config::{self, Settings};
use barscope::layout::BarStyle;
use barscope::render::{BarWindow, Canvas, WindowOptions};
use barscope::{LoopOutcome, Visualizer};
use cli::Cli;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                let _ = err.print();
                std::process::exit(1);
            }
        },
    };

    match run(cli) {
        Ok(outcome) => log::debug!("Exiting after {} buffer(s)", outcome.iterations),
        Err(err) => {
            log::error!("{:#}", err);
            std::process::exit(-1);
        }
    }
}

fn resolve_settings(cli: &Cli) -> Settings {
    let mut settings = Settings {
        fft_size: cli.fft_size,
        width: cli.width,
        height: cli.height,
        style: BarStyle {
            mode: cli.mode,
            gain: cli.gain,
            ..BarStyle::default()
        },
        ..Settings::default()
    };

    if let Some(ref path) = config::find_config(cli.config.clone()) {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            cfg.merge_into(&mut settings);
        }
    }

    settings
}

fn run(cli: Cli) -> Result<LoopOutcome> {
    let settings = resolve_settings(&cli);

    log::info!("barscope - real-time frequency bars");
    log::info!("Input: {}", cli.input.display());

    let mut source = SymphoniaSource::open(&cli.input)
        .with_context(|| format!("Unable to open input file {}", cli.input.display()))?;
    let track = source.track();

    let options = WindowOptions {
        title: settings.title.clone(),
        width: settings.width,
        height: settings.height,
        mode: settings.style.mode,
        max_bars: settings.fft_size / 2,
    };
    let mut window = BarWindow::open(&options).context("Failed to open window")?;

    let mut visualizer = Visualizer::new(
        track,
        settings.fft_size,
        settings.style,
        window.viewport(),
    )
    .context("Failed to set up spectral analyzer")?;
    if !cli.no_progress {
        visualizer = visualizer.with_progress(track.total_frames);
    }

    log::info!(
        "FFT size {}, {} bars, one buffer every {:.3}ms",
        settings.fft_size,
        visualizer.analyzer().bin_count(),
        visualizer.pacing().interval().as_secs_f64() * 1000.0
    );

    let mut player = if cli.no_audio {
        log::info!("Audio playback disabled");
        None
    } else {
        Some(AudioPlayer::load(&cli.input).context("Failed to initialize audio playback")?)
    };

    let outcome = visualizer.run(
        &mut source,
        &mut window,
        player.as_mut().map(|p| p as &mut dyn Playback),
    )?;

    if let Some(ref player) = player {
        if !player.is_finished() {
            log::debug!("Playback stopped at frame {}", player.position());
        }
    }

    Ok(outcome)
}
