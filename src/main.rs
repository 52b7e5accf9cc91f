// SPDX-License-Identifier: MIT
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod config;
mod export;
mod import;
mod logging;
mod playback;
mod session;
mod spectrum;
mod sync;
mod tui;
mod video;

use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use num_format::{Locale, ToFormattedString};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::info;

use crate::config::Config;
use crate::export::export_to_path;
use crate::import::{DatasetPaths, ImportOptions, Importer};
use crate::sync::Synchronizer;
use crate::tui::app::{App, ViewSettings};
use crate::tui::input::handle_key;
use crate::video::FfprobeProbe;

const EVENT_POLL_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Parser)]
#[command(
    name = "spectraview",
    version,
    about = "spectraview: step through a video alongside its spectral time series"
)]
struct Cli {
    /// Configuration file; `spectraview.toml` is read when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DatasetArgs {
    /// Video file, probed with ffprobe
    video: PathBuf,
    /// Spectral data file
    spectra: PathBuf,
    /// Control-input log supplying metadata field defaults
    #[arg(long)]
    controls: Option<PathBuf>,
    /// Frame-time mapping; derived from the video frame rate when absent
    #[arg(long)]
    frame_times: Option<PathBuf>,
    /// Dark reference log for display-time correction
    #[arg(long)]
    dark_reference: Option<PathBuf>,
}

impl DatasetArgs {
    fn into_paths(self, config: &Config) -> DatasetPaths {
        DatasetPaths {
            video: self.video,
            spectra: self.spectra,
            frame_times: self.frame_times,
            controls: self.controls,
            dark_reference: self.dark_reference.or_else(|| config.dark_reference.clone()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Browse a dataset in the terminal viewer
    View {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Browse a dataset directory using the conventional file names
    Open {
        dir: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export a dataset to CSV without the viewer
    Export {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print a dataset summary
    Inspect {
        #[command(flatten)]
        dataset: DatasetArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    if let Err(err) = logging::init(&config) {
        eprintln!("warning: logging disabled: {err:#}");
    }

    match cli.command {
        Commands::View { dataset, output } => {
            let paths = dataset.into_paths(&config);
            cmd_view(&config, paths, output)
        }
        Commands::Open { dir, output } => {
            let mut paths = DatasetPaths::discover(&dir)?;
            if paths.dark_reference.is_none() {
                paths.dark_reference.clone_from(&config.dark_reference);
            }
            cmd_view(&config, paths, output)
        }
        Commands::Export { dataset, output } => {
            cmd_export(&config, &dataset.into_paths(&config), &output)
        }
        Commands::Inspect { dataset } => cmd_inspect(&config, &dataset.into_paths(&config)),
    }
}

fn build_importer(config: &Config) -> Importer {
    Importer::new(
        Box::new(FfprobeProbe::new(config.ffprobe.clone())),
        ImportOptions {
            fallback_fps: config.fallback_fps,
        },
    )
}

// ---------------------------------------------------------------------------
// Signal handling
// ---------------------------------------------------------------------------

fn install_signal_handler() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))
        .context("failed to register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))
        .context("failed to register SIGTERM handler")?;
    Ok(shutdown)
}

// ---------------------------------------------------------------------------
// Terminal setup / teardown
// ---------------------------------------------------------------------------

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen)
        .context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("failed to create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// View / open subcommands
// ---------------------------------------------------------------------------

fn cmd_view(config: &Config, paths: DatasetPaths, output: Option<PathBuf>) -> Result<()> {
    let importer = build_importer(config);
    let session = importer.load(&paths)?;

    let settings = ViewSettings {
        smoothing_taps: config.smoothing_taps,
        output_path: output.unwrap_or_else(|| config.output_path.clone()),
    };
    let mut app = App::new(Synchronizer::new(session), paths, importer, settings);

    let shutdown = install_signal_handler()?;
    let mut terminal = setup_terminal()?;

    let result = run_view_loop(&shutdown, &mut app, &mut terminal);

    restore_terminal(&mut terminal)?;
    info!("viewer closed");
    result
}

fn run_view_loop(
    shutdown: &Arc<AtomicBool>,
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::Relaxed) || app.should_quit {
            break;
        }

        if event::poll(EVENT_POLL_TIMEOUT).context("failed to poll events")?
            && let Event::Key(key) = event::read().context("failed to read event")?
            && key.kind == KeyEventKind::Press
        {
            let action = handle_key(key.code, app.is_editing());
            app.handle_action(&action);
        }

        app.tick();

        terminal
            .draw(|f| app.render(f))
            .context("failed to draw frame")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Export subcommand
// ---------------------------------------------------------------------------

fn cmd_export(config: &Config, paths: &DatasetPaths, output: &Path) -> Result<()> {
    let session = build_importer(config).load(paths)?;
    let sync = Synchronizer::new(session);
    let rows = export_to_path(&sync, output)?;

    eprintln!(
        "Exported {} frames from {} to {}",
        rows.to_formatted_string(&Locale::en),
        paths.name(),
        output.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Inspect subcommand
// ---------------------------------------------------------------------------

fn cmd_inspect(config: &Config, paths: &DatasetPaths) -> Result<()> {
    let session = build_importer(config).load(paths)?;
    let sync = Synchronizer::new(session);
    for line in summary_lines(&sync, &paths.name()) {
        println!("{line}");
    }
    Ok(())
}

fn span(first: Option<f64>, last: Option<f64>) -> String {
    match (first, last) {
        (Some(a), Some(b)) => format!("{a:.6} s .. {b:.6} s"),
        _ => "-".to_string(),
    }
}

fn summary_lines(sync: &Synchronizer, name: &str) -> Vec<String> {
    let session = sync.session();
    let frames = session.frames();
    let spectra = session.spectra();
    let axis = session.wavelengths();

    let wavelength_range = match (axis.labels.first(), axis.labels.last()) {
        (Some(lo), Some(hi)) => format!("{lo} .. {hi}"),
        _ => "-".to_string(),
    };
    let first_spectral = sync
        .first_spectral_frame()
        .map_or_else(|err| err.to_string(), |i| i.to_string());
    let controls: Vec<&str> = session.template().keys().map(String::as_str).collect();

    vec![
        format!("         Dataset: {name}"),
        format!(
            "          Frames: {} ({})",
            frames.len().to_formatted_string(&Locale::en),
            span(frames.first().map(|f| f.timestamp), frames.last().map(|f| f.timestamp)),
        ),
        format!(
            "         Spectra: {} ({})",
            spectra.len().to_formatted_string(&Locale::en),
            span(spectra.first().map(|s| s.timestamp), spectra.last().map(|s| s.timestamp)),
        ),
        format!("     Wavelengths: {} ({wavelength_range})", axis.len()),
        format!("  First spectral: {first_spectral}"),
        format!("  Control fields: {}", controls.join(", ")),
        format!("  Dark reference: {} rows", session.dark_reference().len()),
    ]
}
