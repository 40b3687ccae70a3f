use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use iadl_core::{
    DownloadEngine, FileLink, HttpClient, JobReport, JobSummary, LinkDiscovery, NoopProgress,
    ProgressObserver, RetryPolicy, item_id_from_url, resolve_filter,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::config::{self, HttpTimeoutSettings};
use crate::app::progress::BarProgress;
use crate::app::{exit_handler, output, terminal};
use crate::cli::Args;

pub(crate) async fn run() -> Result<ProcessExit> {
    let (cli, cli_sources) = config::parse_cli_with_sources();
    let resolved = config::resolve_config(cli, &cli_sources)?;
    let args = resolved.args;

    terminal::init_tracing(
        terminal::resolve_default_log_level(&args),
        terminal::is_no_color_requested(),
    );

    if let (Some(path), Some(file_config)) = (&resolved.loaded.path, &resolved.loaded.config) {
        debug!(
            path = %path.display(),
            verbosity = file_config.verbosity.map(|v| v.as_str()),
            "Loaded config file"
        );
    }
    debug!(?args, "CLI arguments parsed");

    let Some(item_id) = item_id_from_url(&args.url) else {
        bail!("Could not derive an item identifier from '{}'", args.url);
    };
    info!(item_id = %item_id, "Resolved item identifier");

    let selected = args.categories.selected();
    let filter = resolve_filter(&selected);
    if selected.is_empty() {
        info!("No filters applied");
    } else {
        info!(suffixes = ?filter.suffixes(), "Applying file filters");
    }

    let destination = resolve_destination(&args)?;

    let discovery = LinkDiscovery::new(&args.base_url).context("Invalid --base-url")?;
    let print_listing = args.show_links && !args.json;
    let mut links = match discovery.discover(&item_id, &filter, print_listing).await {
        Ok(links) => links,
        Err(error) => {
            eprintln!("error: could not list files for '{item_id}': {error}");
            return Ok(ProcessExit::Failure);
        }
    };

    if links.is_empty() {
        print_nothing_found(&args)?;
        return Ok(ProcessExit::Success);
    }

    apply_limit(&mut links, args.limit);

    let Some(destination) = destination else {
        if args.json {
            println!("{}", output::format_links_json(&links)?);
        } else {
            println!("{}", output::PREVIEW_DONE);
        }
        return Ok(ProcessExit::Success);
    };

    download(&args, resolved.timeouts, links, destination).await
}

/// Destination folder, or `None` for a preview run.
fn resolve_destination(args: &Args) -> Result<Option<PathBuf>> {
    if args.show_links {
        return Ok(None);
    }
    args.dest
        .clone()
        .map(Some)
        .ok_or_else(|| anyhow!("--dest is required unless --show-links is given"))
}

fn apply_limit(links: &mut Vec<FileLink>, limit: usize) {
    if limit > 0 && links.len() > limit {
        info!(limit, found = links.len(), "Applying file limit");
        links.truncate(limit);
    }
}

fn print_nothing_found(args: &Args) -> Result<()> {
    if !args.json {
        println!("{}", output::NO_FILES_FOUND);
    } else if args.show_links {
        println!("{}", output::format_links_json(&[])?);
    } else {
        let empty = JobReport {
            summary: JobSummary::default(),
            tasks: Vec::new(),
        };
        println!("{}", output::format_summary_json(&empty)?);
    }
    Ok(())
}

async fn download(
    args: &Args,
    timeouts: HttpTimeoutSettings,
    links: Vec<FileLink>,
    destination: PathBuf,
) -> Result<ProcessExit> {
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, letting in-flight downloads settle");
            signal_token.cancel();
        }
    });

    let fetcher = HttpClient::with_timeouts(timeouts.connect_secs, timeouts.read_secs)
        .context("Failed to build HTTP client")?;
    let policy = RetryPolicy::new(
        u32::from(args.max_retries),
        Duration::from_millis(args.retry_backoff_ms),
    );
    let engine = DownloadEngine::new(
        usize::from(args.concurrent),
        policy,
        Duration::from_millis(args.courtesy_delay_ms),
    )?;

    let use_bars = terminal::should_use_progress_bars(
        io::stderr().is_terminal(),
        args.quiet,
        args.json,
        terminal::is_dumb_terminal(),
    );
    let bars = use_bars.then(|| Arc::new(BarProgress::new(links.len())));
    let observer: Arc<dyn ProgressObserver> = match &bars {
        Some(bars) => Arc::clone(bars) as Arc<dyn ProgressObserver>,
        None => Arc::new(NoopProgress),
    };

    info!(
        files = links.len(),
        concurrency = engine.concurrency(),
        dest = %destination.display(),
        "Starting downloads"
    );
    let report = engine
        .run(links, &destination, Arc::new(fetcher), cancel, observer)
        .await?;

    if let Some(bars) = &bars {
        bars.finish();
    }

    let summary = report.summary;
    info!(
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        cancelled = summary.cancelled,
        retried = summary.retried,
        "Download complete"
    );
    output::print_summary(&report, &destination, args.json)?;

    if summary.interrupted {
        warn!(
            completed = summary.succeeded + summary.skipped,
            total = summary.total(),
            "Interrupted. Run again to fetch the remaining files."
        );
    }

    Ok(exit_handler::determine_exit_outcome(&summary))
}
