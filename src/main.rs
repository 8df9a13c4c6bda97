use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use sysvitals::config::{CollectionSettings, Config, load_config, load_config_from_path};
use sysvitals::format::{format_bytes, summary_line, window_report};
use sysvitals::logging::{self, LogFormat};
use sysvitals::system::orchestrator::Orchestrator;
use sysvitals::system::snapshot::Snapshot;
use sysvitals::system::source::Category;

#[derive(Parser)]
#[command(
    name = "sysvitals",
    about = "Headless system metrics collector with rolling history"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Collection interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Seconds of history to retain
    #[arg(long)]
    history_secs: Option<u64>,

    /// Number of top processes to report
    #[arg(long)]
    top: Option<usize>,

    /// Disable accelerator monitoring
    #[arg(long, default_value_t = false)]
    no_gpu: bool,

    /// Disable the process table
    #[arg(long, default_value_t = false)]
    no_processes: bool,

    /// Stop after this many snapshots
    #[arg(long)]
    ticks: Option<usize>,

    /// Print snapshots as JSON lines instead of text summaries
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log filter, e.g. `debug` or `sysvitals=trace`
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);
    logging::init_tracing(&config.logging.level, config.logging.format)?;

    // corrections are logged as warnings
    let (settings, _) = CollectionSettings::from_config(&config.monitoring);

    let orchestrator = Orchestrator::with_default_sources(settings);
    print_header(&orchestrator, cli.json)?;

    let (subscription, mut snapshots) = orchestrator.subscribe_channel();
    orchestrator.start(orchestrator.settings().tick_interval)?;

    let mut received = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = snapshots.recv() => {
                let Some(snapshot) = next else { break };
                print_snapshot(&snapshot, cli.json)?;
                received += 1;
                if cli.ticks.is_some_and(|limit| received >= limit) {
                    break;
                }
            }
        }
    }

    orchestrator.unsubscribe(subscription);
    orchestrator.stop().await;

    if !cli.json {
        let history = orchestrator.history();
        let window = history.len();
        if let (Some(average), Some(range)) = (history.average(window), history.min_max(window)) {
            print!("{}", window_report(&average, &range));
        }
    }
    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    let monitoring = &mut config.monitoring;
    if let Some(interval) = cli.interval_ms {
        monitoring.update_interval_ms = interval;
    }
    if let Some(secs) = cli.history_secs {
        monitoring.history_duration_secs = secs;
    }
    if let Some(top) = cli.top {
        monitoring.top_process_count = top;
    }
    if cli.no_gpu {
        monitoring.sources.set(Category::Gpu, false);
    }
    if cli.no_processes {
        monitoring.sources.set(Category::Processes, false);
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    config
}

fn print_header(orchestrator: &Orchestrator, json: bool) -> Result<()> {
    let info = orchestrator.system_info();
    if json {
        println!("{}", serde_json::to_string(&info)?);
        return Ok(());
    }
    let settings = orchestrator.settings();
    println!(
        "{} | {} | {} ({} threads) | {} RAM",
        info.host_name.as_deref().unwrap_or("unknown host"),
        info.os_version.as_deref().unwrap_or("unknown OS"),
        info.cpu_brand.as_deref().unwrap_or("unknown CPU"),
        info.logical_cores,
        format_bytes(info.total_memory_bytes),
    );
    let categories: Vec<&str> = orchestrator
        .active_categories()
        .into_iter()
        .map(Category::name)
        .collect();
    println!(
        "sampling {} every {}ms, keeping {} snapshots",
        categories.join(", "),
        settings.tick_interval.as_millis(),
        settings.history_capacity,
    );
    Ok(())
}

fn print_snapshot(snapshot: &Arc<Snapshot>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot.as_ref())?);
    } else {
        println!("{}", summary_line(snapshot));
    }
    Ok(())
}
