use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use rust_photobooth::capture::SessionEvent;
use rust_photobooth::config::Configuration;
use rust_photobooth::events::{BoothCommand, BoothEvent, CompletedSession};
use rust_photobooth::filters::FilterKind;
use rust_photobooth::render::presenter::HeadlessPresenter;
use rust_photobooth::tasks;
use rust_photobooth::video::SourceSpec;

#[derive(Debug, Parser)]
#[command(name = "photobooth", version, about = "Live-filter photobooth")]
struct Args {
    /// Path to YAML config; built-in defaults when omitted
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Initial filter, by name or registry index
    #[arg(long, value_name = "NAME|INDEX")]
    filter: Option<String>,
    /// Video source: pattern[:WxH], image:PATH or camera[:DEVICE]
    #[arg(long, value_name = "SOURCE")]
    source: Option<SourceSpec>,
    /// Run one capture session as soon as the preview is ready, then exit
    #[arg(long)]
    auto_capture: bool,
    /// Print the filter registry and exit
    #[arg(long)]
    list_filters: bool,
    /// Open a desktop window instead of running headless
    #[arg(long)]
    window: bool,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let fallback = match verbosity {
        0 => "info",
        1 => "info,rust_photobooth=debug",
        _ => "info,rust_photobooth=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_target(false)
        .compact()
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Configuration> {
    let cfg = match path {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    cfg.validated().context("invalid configuration values")
}

fn apply_filter_override(cfg: &mut Configuration, wanted: &str) -> Result<()> {
    let index = match wanted.parse::<usize>() {
        Ok(index) => index,
        Err(_) => {
            let kind: FilterKind = wanted.parse()?;
            match cfg.filters.iter().position(|k| *k == kind) {
                Some(index) => index,
                None => bail!("filter {kind} is not in the configured registry"),
            }
        }
    };
    if index >= cfg.filters.len() {
        bail!("filter index {index} is out of range for {} filters", cfg.filters.len());
    }
    cfg.initial_filter = index;
    Ok(())
}

fn default_source(cfg: &Configuration) -> SourceSpec {
    if cfg!(feature = "camera") {
        SourceSpec::Camera {
            device: cfg.camera.device.clone(),
        }
    } else {
        SourceSpec::default()
    }
}

/// Logs booth events; with `auto_capture` it also starts one session and
/// stops the booth once that session is complete.
async fn watch_events(
    mut events: mpsc::Receiver<BoothEvent>,
    commands: mpsc::Sender<BoothCommand>,
    auto_capture: bool,
) -> Result<()> {
    let mut started = false;
    while let Some(event) = events.recv().await {
        match &event {
            BoothEvent::Ready(true) if auto_capture && !started => {
                started = true;
                commands.send(BoothCommand::StartCapture).await?;
            }
            BoothEvent::Session(SessionEvent::Completed { shots }) => {
                tracing::info!(shots, "session complete");
                if auto_capture {
                    commands.send(BoothCommand::Shutdown).await?;
                }
            }
            BoothEvent::Session(SessionEvent::CountdownTick { shot, remaining }) => {
                tracing::info!(shot, remaining, "countdown");
            }
            BoothEvent::DeviceFault { kind, message } => {
                tracing::error!(?kind, "{message}");
            }
            other => tracing::debug!(?other, "booth event"),
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.list_filters {
        for (index, kind) in FilterKind::ALL.iter().enumerate() {
            println!("{index:>2}  {kind}");
        }
        return Ok(());
    }

    let mut cfg = load_config(args.config.as_ref())?;
    if let Some(wanted) = args.filter.as_deref() {
        apply_filter_override(&mut cfg, wanted).context("invalid --filter")?;
    }
    let source = args.source.clone().unwrap_or_else(|| default_source(&cfg));
    tracing::info!(source = %source, output = %cfg.output_dir.display(), "starting photobooth");

    // Channels (small/bounded)
    let (command_tx, command_rx) = mpsc::channel::<BoothCommand>(16); // CLI/automation -> Booth
    let (event_tx, event_rx) = mpsc::channel::<BoothEvent>(64); // Booth -> watcher
    let (save_tx, save_rx) = mpsc::channel::<CompletedSession>(4); // Booth -> Saver

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Saver
    tasks.spawn({
        let output_dir = cfg.output_dir.clone();
        let strip = cfg.strip.clone();
        let ratio = cfg.target_aspect_ratio;
        let cancel = cancel.clone();
        async move {
            tasks::saver::run(save_rx, output_dir, strip, ratio, cancel)
                .await
                .context("saver task failed")
        }
    });

    // Event watcher
    tasks.spawn({
        let commands = command_tx.clone();
        let auto_capture = args.auto_capture;
        async move { watch_events(event_rx, commands, auto_capture).await }
    });

    // The presenter may not be Send; the booth runs on this task
    let booth = if args.window {
        run_windowed(cfg, source, command_rx, event_tx, save_tx, cancel.clone()).await
    } else {
        let mut presenter = HeadlessPresenter::new(f64::from(cfg.window.width), f64::from(cfg.window.height));
        tasks::booth::run(cfg, &mut presenter, source, command_rx, event_tx, save_tx, cancel.clone()).await
    };
    if let Err(e) = booth.context("booth failed") {
        tracing::error!("{e:?}");
    }
    cancel.cancel();
    drop(command_tx);

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}

#[cfg(feature = "window")]
async fn run_windowed(
    cfg: Configuration,
    source: SourceSpec,
    commands: mpsc::Receiver<BoothCommand>,
    events: mpsc::Sender<BoothEvent>,
    saver: mpsc::Sender<CompletedSession>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut presenter = rust_photobooth::render::presenter::WindowPresenter::open(&cfg.window)
        .context("failed to open window")?;
    tasks::booth::run(cfg, &mut presenter, source, commands, events, saver, cancel).await
}

#[cfg(not(feature = "window"))]
async fn run_windowed(
    _cfg: Configuration,
    _source: SourceSpec,
    _commands: mpsc::Receiver<BoothCommand>,
    _events: mpsc::Sender<BoothEvent>,
    _saver: mpsc::Sender<CompletedSession>,
    _cancel: CancellationToken,
) -> Result<()> {
    bail!("this build has no window support (enable the `window` feature)")
}
