use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use media_uploader::config;
use media_uploader::media_source::FileAssetSource;
use media_uploader::notifications::LogSurface;
use media_uploader::uploader::{
    status_presenter, HttpReachabilityProbe, HttpTransferChannel, ReachabilityProbe,
    StaticReachability,
};
use media_uploader::{AppError, UploadSession};

const HELP: &str = "\
media-uploader - queue local media files and upload them one by one

USAGE:
  media-uploader [OPTIONS] FILE...

OPTIONS:
  --endpoint URL          Upload endpoint (overrides config)
  --config PATH           Read configuration from PATH instead of the default location
  --selection-limit N     Maximum number of files taken from the command line
  --show-status           Print the per-item status table when done
  -h, --help              Print this help
";

/// How often waiting uploads re-check connectivity
const RESUME_INTERVAL: Duration = Duration::from_secs(10);

struct Args {
    endpoint: Option<String>,
    config_path: Option<PathBuf>,
    selection_limit: Option<usize>,
    show_status: bool,
    files: Vec<PathBuf>,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut args = pico_args::Arguments::from_env();

    if args.contains(["-h", "--help"]) {
        print!("{}", HELP);
        return Ok(None);
    }

    Ok(Some(Args {
        endpoint: args.opt_value_from_str("--endpoint")?,
        config_path: args.opt_value_from_str("--config")?,
        selection_limit: args.opt_value_from_str("--selection-limit")?,
        show_status: args.contains("--show-status"),
        files: args.finish().into_iter().map(PathBuf::from).collect(),
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let mut config = match &args.config_path {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
    .context("failed to load configuration")?;

    if let Some(endpoint) = args.endpoint {
        config.upload_endpoint = Some(endpoint);
    }
    config.selection_limit = args.selection_limit.unwrap_or(args.files.len().max(1));

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .parse_default_env()
        .init();

    log::info!("Starting media uploader");

    let transfer = Arc::new(HttpTransferChannel::from_config(&config)?);
    let probe: Arc<dyn ReachabilityProbe> = match config.reachability_target() {
        Some(url) => Arc::new(HttpReachabilityProbe::new(url)?),
        None => Arc::new(StaticReachability::new(true)),
    };

    let session = UploadSession::start(config, transfer, probe, Arc::new(LogSurface))?;
    let queue = Arc::clone(session.queue());
    let source = FileAssetSource::new(args.files);

    match session.pick_and_enqueue(&source).await {
        Ok(report) => {
            for rejected in &report.rejected {
                log::warn!("Not uploading {}: {}", rejected.file_name, rejected.reason);
            }
        }
        Err(AppError::PickerCancelled) => {
            log::info!("No files selected, nothing to upload");
        }
        Err(e) => return Err(e.into()),
    }

    let mut resume = tokio::time::interval(RESUME_INTERVAL);
    resume.tick().await;
    let mut updates = session.queue().subscribe();

    loop {
        if session.snapshot().count_in_progress() == 0 {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = resume.tick() => {
                if let Err(e) = session.resume() {
                    log::error!("Failed to resume uploads: {}", e);
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, waiting for running uploads to finish");
                break;
            }
        }
    }

    // Uploads still running after an interrupt finish during shutdown
    session.shutdown().await;

    let view = status_presenter::present(&queue.snapshot(), true);
    if args.show_status {
        for row in &view.rows {
            println!("{:<40} {:>10}  {}", row.file_name, row.size, row.label);
        }
    }
    println!("{}", view.summary());

    if view.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
