//! Zonemix Player - interactive host
//!
//! Drives a [`MusicManager`] from a single task: a tokio interval ticks the
//! fades and delayed plays, and zone requests arrive as lines on stdin.
//! Audio output, scene loading and mixer effects are logging stand-ins.
//!
//! Commands:
//! - `<zone>`: go to a zone by id or name (`1`, `item_shop`, ...)
//! - `cut <zone>`: hard cut to a zone
//! - `status`: print a JSON snapshot
//! - `quit`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};
use zonemix_common::config::{ChannelConfig, MusicConfig};
use zonemix_common::events::{EventBus, ZoneEvent};
use zonemix_player::playback::{
    AudioSource, ChannelRegistry, MixerEffects, TransitionExecutor, ZoneLoader,
};
use zonemix_player::{MusicManager, TransitionOutcome, ZoneId};

/// Command-line arguments for zonemix-player
#[derive(Parser, Debug)]
#[command(name = "zonemix-player")]
#[command(about = "Zone-driven background music with crossfaded transitions")]
#[command(version)]
struct Args {
    /// Music configuration file (TOML)
    #[arg(short, long, env = "ZONEMIX_CONFIG")]
    config: Option<PathBuf>,

    /// Crossfade duration in seconds (overrides the config file)
    #[arg(long)]
    fade_time: Option<f32>,

    /// Tick interval in milliseconds
    #[arg(long, default_value = "16")]
    tick_ms: u64,

    /// Log zone events as JSON
    #[arg(long)]
    json_events: bool,
}

/// Audio backend that logs what a real output would do
struct LoggingSource {
    index: usize,
    clip: String,
}

impl AudioSource for LoggingSource {
    fn play(&mut self) {
        info!(channel = self.index, clip = %self.clip, "play");
    }

    fn stop(&mut self) {
        info!(channel = self.index, clip = %self.clip, "stop");
    }

    fn set_volume(&mut self, volume: f32) {
        debug!(channel = self.index, volume, "volume");
    }
}

/// Scene loader and mixer stand-in
struct LoggingHost;

impl ZoneLoader for LoggingHost {
    fn load_zone(&mut self, zone: ZoneId) {
        info!(zone = %zone, "Loading zone");
    }
}

impl MixerEffects for LoggingHost {
    fn trigger_effect(&mut self, effect: &str, duration: Duration) {
        info!(effect, duration_ms = duration.as_millis() as u64, "Mixer effect");
    }
}

enum Command {
    Go(ZoneId),
    Cut(ZoneId),
    Status,
    Quit,
}

fn parse_zone(manager: &MusicManager, token: &str) -> Option<ZoneId> {
    let engine = manager.engine();
    match token.parse::<u32>() {
        Ok(id) => Some(ZoneId(id)),
        Err(_) => engine.zone_by_name(token).map(|z| z.id),
    }
}

fn parse_command(manager: &MusicManager, line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    match (words.next()?, words.next()) {
        ("quit" | "q" | "exit", None) => Some(Command::Quit),
        ("status" | "s", None) => Some(Command::Status),
        ("cut", Some(zone)) => parse_zone(manager, zone).map(Command::Cut),
        (zone, None) => parse_zone(manager, zone).map(Command::Go),
        _ => None,
    }
}

/// Returns false when the host should exit
fn handle_line(manager: &mut MusicManager, line: &str) -> Result<bool> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(true);
    }

    let outcome = match parse_command(manager, line) {
        Some(Command::Quit) => return Ok(false),
        Some(Command::Status) => {
            let snapshot = serde_json::to_string_pretty(&manager.snapshot())
                .context("Failed to serialize snapshot")?;
            println!("{}", snapshot);
            return Ok(true);
        }
        Some(Command::Go(zone)) => manager.request_zone(zone),
        Some(Command::Cut(zone)) => manager.cut_to_zone(zone),
        None => {
            warn!("Unrecognized command: {}", line);
            return Ok(true);
        }
    };

    match outcome {
        Ok(TransitionOutcome::Committed { plan, .. }) => {
            println!("-> zone {} (channel {})", plan.zone, manager.current_channel());
        }
        Ok(TransitionOutcome::NoOpTransition { zone }) => {
            println!("already in zone {}", zone);
        }
        Err(e) => {
            warn!("Zone request failed: {}", e);
            println!("error: {}", e);
        }
    }
    Ok(true)
}

/// Filter for the workspace crates at `level`
///
/// An unparsable level falls back to `info`.
fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("zonemix_player={0},zonemix_common={0}", level))
        .unwrap_or_else(|_| EnvFilter::new("zonemix_player=info,zonemix_common=info"))
}

fn log_event(event: &ZoneEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => info!(target: "zonemix_player::events", "{}", line),
            Err(e) => warn!("Failed to serialize event: {}", e),
        }
    } else {
        info!(target: "zonemix_player::events", "{:?}", event);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; RUST_LOG wins over the config file's level
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| log_filter("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut config = MusicConfig::load_or_reference(args.config.as_deref())
        .context("Failed to load music configuration")?;
    if let Some(fade_time) = args.fade_time {
        config.fade_time = fade_time;
        config.validate().context("Invalid --fade-time")?;
    }

    if !filter_from_env {
        filter_handle
            .reload(log_filter(&config.logging.level))
            .context("Failed to apply configured log level")?;
    }

    info!(
        "Starting zonemix player: {} channels, {} zones, fade {}s",
        config.channels.len(),
        config.zones.len(),
        config.fade_time
    );

    let channels = ChannelRegistry::new(&config.channels, |index, channel: &ChannelConfig| {
        Box::new(LoggingSource {
            index,
            clip: channel.clip.clone(),
        })
    });
    let executor = TransitionExecutor::new(Box::new(LoggingHost), Box::new(LoggingHost));

    let event_bus = EventBus::new(256);
    let mut events = event_bus.subscribe();
    let json_events = args.json_events;
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            log_event(&event, json_events);
        }
    });

    let mut manager = MusicManager::new(&config, channels, executor)
        .context("Failed to initialize music manager")?
        .with_event_bus(event_bus);
    manager.start().context("Failed to start music")?;

    let mut interval = tokio::time::interval(Duration::from_millis(args.tick_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                manager.tick(now - last_tick);
                last_tick = now;
            }
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        if !handle_line(&mut manager, &line)? {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = &mut shutdown => break,
        }
    }

    info!(zone = %manager.current_zone(), "Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
