use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use focustube::api::{ApiServer, AppState};
use focustube::intervals::{
    extract_intervals, format_timestamp, parse_iso8601_duration, parse_timestamp, total_watch_time,
    Interval, PlaybackScheduler, PlaybackWidget, SchedulerConfig, SchedulerEvent, SimulatedPlayer,
};
use focustube::store::JsonStore;
use focustube::youtube::YouTubeClient;
use focustube::Config;

#[derive(Parser)]
#[command(name = "focustube")]
#[command(version, author = "TigreRoll")]
#[command(about = "Focused playback of YouTube playlists with per-video intervals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the standard search path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,

        /// Override the configured data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Print the intervals found in a video description
    Extract {
        /// Description file; reads stdin when omitted
        file: Option<PathBuf>,

        /// Video duration, in seconds or ISO-8601 (e.g. PT12M30S)
        #[arg(long)]
        duration: Option<String>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Play intervals against a simulated player in real time
    Simulate {
        /// Video duration in seconds
        #[arg(long)]
        duration: f64,

        /// Interval as START-END (seconds or m:ss), repeatable
        #[arg(long = "interval")]
        intervals: Vec<String>,

        /// Take intervals from a description file instead
        #[arg(long, conflicts_with = "intervals")]
        description: Option<PathBuf>,

        /// Loop back to the first interval after the last one
        #[arg(long = "loop")]
        loop_enabled: bool,

        /// Stop after this many seconds
        #[arg(long, default_value = "60")]
        run_for: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve { port, data_dir } => serve(config, port, data_dir).await,
        Commands::Extract { file, duration, json } => extract(file, duration, json).await,
        Commands::Simulate {
            duration,
            intervals,
            description,
            loop_enabled,
            run_for,
        } => simulate(&config, duration, intervals, description, loop_enabled, run_for).await,
    }
}

async fn serve(mut config: Config, port: Option<u16>, data_dir: Option<PathBuf>) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir;
    }

    config.validate()?;
    info!("🚀 FocusTube starting...");
    info!("{}", config.summary());

    let store = JsonStore::open(config.storage.data_dir.clone()).await?;
    let catalog = YouTubeClient::new(&config.youtube.api_base, config.youtube.timeout_seconds)?;
    let state = AppState::new(Arc::new(config), store, Arc::new(catalog));

    ApiServer::new(state).start_background().await??;
    Ok(())
}

async fn read_description(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Cannot read {}", path.display())),
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            Ok(text)
        }
    }
}

fn parse_duration_arg(value: &str) -> Result<f64> {
    if let Ok(seconds) = value.parse::<f64>() {
        return Ok(seconds);
    }
    parse_iso8601_duration(value)
        .map(f64::from)
        .ok_or_else(|| anyhow!("Unrecognized duration: {}", value))
}

fn parse_time_arg(value: &str) -> Result<f64> {
    let value = value.trim();
    if value.contains(':') {
        parse_timestamp(value)
            .map(f64::from)
            .ok_or_else(|| anyhow!("Invalid timestamp: {}", value))
    } else {
        value.parse().with_context(|| format!("Invalid time: {}", value))
    }
}

fn parse_interval_arg(value: &str) -> Result<Interval> {
    let (start, end) = value
        .split_once('-')
        .ok_or_else(|| anyhow!("Interval must look like START-END: {}", value))?;
    let interval = Interval::new(parse_time_arg(start)?, parse_time_arg(end)?);
    interval.validate()?;
    Ok(interval)
}

async fn extract(file: Option<PathBuf>, duration: Option<String>, json: bool) -> Result<()> {
    let description = read_description(file).await?;
    let duration = duration.as_deref().map(parse_duration_arg).transpose()?;

    let intervals = extract_intervals(&description, duration);

    if json {
        println!("{}", serde_json::to_string_pretty(&intervals)?);
        return Ok(());
    }

    if intervals.is_empty() {
        println!("No chapter markers found");
        return Ok(());
    }

    for (i, interval) in intervals.iter().enumerate() {
        println!(
            "{:>3}. {} - {}",
            i + 1,
            format_timestamp(interval.start_time),
            format_timestamp(interval.end_time)
        );
    }
    println!("Total: {}", format_timestamp(total_watch_time(&intervals)));

    Ok(())
}

async fn simulate(
    config: &Config,
    duration: f64,
    interval_args: Vec<String>,
    description: Option<PathBuf>,
    loop_enabled: bool,
    run_for: u64,
) -> Result<()> {
    let intervals = match description {
        Some(path) => extract_intervals(&read_description(Some(path)).await?, Some(duration)),
        None => interval_args
            .iter()
            .map(String::as_str)
            .map(parse_interval_arg)
            .collect::<Result<Vec<_>>>()?,
    };

    if intervals.is_empty() {
        warn!("No intervals given; the video will play straight through");
    }

    let player = Arc::new(SimulatedPlayer::new(duration));
    player.mark_ready();
    player.play()?;

    let loop_enabled = loop_enabled || config.scheduler.loop_by_default;
    let schedule = SchedulerConfig::new("simulated", intervals, loop_enabled);
    let sorted = schedule.sorted_intervals();

    let (mut scheduler, mut events) = PlaybackScheduler::new(player.clone(), config.scheduler.poll_interval());
    scheduler.start(schedule);
    info!("▶️ Simulating {} intervals over {}", sorted.len(), format_timestamp(duration));

    let deadline = tokio::time::sleep(Duration::from_secs(run_for));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            event = events.recv() => match event {
                Some(SchedulerEvent::IntervalChanged(index)) => {
                    let Some(interval) = sorted.get(index) else { continue };
                    println!(
                        "▶️ Interval {} ({} - {})",
                        index + 1,
                        format_timestamp(interval.start_time),
                        format_timestamp(interval.end_time)
                    );
                }
                Some(SchedulerEvent::TimeUpdate(_)) => {
                    if !player.is_playing()? {
                        println!("⏹️ Playback stopped at {}", format_timestamp(player.current_time()?));
                        break;
                    }
                }
                None => break,
            },
        }
    }

    scheduler.stop();
    Ok(())
}
