//! `mediavault-import`: operator-facing entry point over the ingestion
//! core, grounded on `apps/cli`'s `clap`-derived subcommand style.
//! Everything here is a thin wire: build an `IngestContext` from config,
//! delegate to the matching `operations::*` entry point, print a summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mediavault_core::config::Config;
use mediavault_core::infrastructure::clock::SystemClock;
use mediavault_core::infrastructure::database::connect_and_migrate;
use mediavault_core::infrastructure::logging::TracingEventLog;
use mediavault_core::infrastructure::task_runner::{TaskInstance, TokioTaskRunner};
use mediavault_core::infrastructure::transcoder::ProcessTranscoder;
use mediavault_core::operations::{local_import, post_processing::retry_monitor, transcode, watchdog};
use mediavault_core::IngestContext;

#[derive(Parser, Debug)]
#[command(name = "mediavault-import")]
#[command(about = "Media ingestion and post-processing core", long_about = None)]
struct Cli {
    /// Directory holding the archive roots and `mediavault.toml`.
    #[arg(long, env = "MEDIAVAULT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the Local-Import Use Case once against a directory.
    Import {
        /// Directory to scan for ingestible files.
        dir: PathBuf,
        /// Attach to an existing Session instead of creating a new one.
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Reclaim stale selection locks and re-publish stalled enqueued rows.
    Watchdog,
    /// Queue videos lacking a completed `std1080p` playback rendition.
    TranscodeScan,
    /// Run the transcode worker over every pending/queued playback row.
    TranscodeRun,
    /// Sweep due `thumbnail.retry` task records.
    RetryMonitor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let data_dir = cli
        .data_dir
        .or_else(|| dirs::data_dir().map(|d| d.join("mediavault")))
        .context("could not determine a data directory; pass --data-dir")?;

    let config = Config::load_or_create(&data_dir).context("loading configuration")?;
    config.ensure_directories().context("creating archive roots")?;

    let db = connect_and_migrate(&config.database_url)
        .await
        .context("connecting to the database")?;

    let ctx = IngestContext::new(
        std::sync::Arc::new(db),
        std::sync::Arc::new(SystemClock),
        std::sync::Arc::new(TokioTaskRunner),
        std::sync::Arc::new(TracingEventLog),
        std::sync::Arc::new(ProcessTranscoder::default()),
        config,
    );

    match cli.command {
        Commands::Import { dir, session_id } => {
            let task_instance = TaskInstance::never_aborted();
            let session = local_import::run(&ctx, session_id.as_deref(), &dir, &task_instance)
                .await
                .context("running local import")?;
            println!(
                "session {} -> status={} stats={}",
                session.session_id, session.status, session.stats
            );
        }
        Commands::Watchdog => {
            let outcome = watchdog::sweep(&ctx).await.context("running watchdog sweep")?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::TranscodeScan => {
            let outcome = transcode::scanner::scan(&ctx).await.context("scanning for pending transcodes")?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::TranscodeRun => {
            run_pending_transcodes(&ctx).await?;
        }
        Commands::RetryMonitor => {
            let outcome = retry_monitor::sweep(&ctx).await.context("sweeping retry monitor")?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

/// Drains every `media_playback` row left `pending` by the Transcode
/// Scanner, running the worker on each in turn (spec §4.8: no parallelism
/// across a single core instance).
async fn run_pending_transcodes(ctx: &IngestContext) -> Result<()> {
    use mediavault_core::infrastructure::database::entities::media_playback;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    let pending = media_playback::Entity::find()
        .filter(media_playback::Column::Status.eq("pending"))
        .all(ctx.db.as_ref())
        .await
        .context("listing pending playback rows")?;

    for row in pending {
        let outcome = transcode::worker::run(ctx, row.id)
            .await
            .with_context(|| format!("running transcode worker for playback {}", row.id))?;
        println!("playback {} -> {} ({})", row.id, outcome.note, outcome.ok);
    }
    Ok(())
}
