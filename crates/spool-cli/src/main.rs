use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tokio::time::{Duration, sleep};
use tracing::info;
use tracing_subscriber::EnvFilter;

use spool_core::app::DeliveryMode;
use spool_core::impls::{FileStorage, LogNotifier, NoopNotifier, WatchReachability};
use spool_core::ports::{Notifier, Sender};
use spool_core::{
    DeliveryDriver, DeliveryQueueBuilder, LogLevel, QueueConfig, QueueEntry, SendFailure,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// One mutation per send, flushed on every enqueue
    Mutations,
    /// Batched log events
    Logs,
}

/// Push a few entries through a durable delivery queue backed by a flaky sender.
#[derive(Debug, Parser)]
#[command(name = "spool", version)]
struct Args {
    /// Directory holding the persisted queue
    #[arg(long, env = "SPOOL_DIR", default_value = "./spool-data")]
    dir: PathBuf,

    #[arg(long, value_enum, default_value_t = Preset::Logs)]
    preset: Preset,

    /// JSON config file; overrides --preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of entries to enqueue
    #[arg(long, default_value_t = 5)]
    count: u32,

    /// Sends that fail before the sender starts accepting
    #[arg(long, default_value_t = 2)]
    fail_first: u32,

    /// Start offline and come back online after this many milliseconds
    #[arg(long)]
    offline_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct LogLine {
    seq: u32,
    message: String,
}

/// Fails the first `n` sends with a 503, then prints every batch.
struct FlakySender {
    remaining_failures: AtomicU32,
}

impl FlakySender {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl Sender for FlakySender {
    async fn send(&self, batch: &[QueueEntry]) -> Result<(), SendFailure> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(SendFailure::status(
                503,
                format!("intentional failure (left={left})"),
            ));
        }

        for entry in batch {
            println!(
                "delivered: {} kind={} retries={} payload={}",
                entry.id, entry.kind, entry.retry_count, entry.payload
            );
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => QueueConfig::from_file(path)?,
        None => match args.preset {
            Preset::Mutations => QueueConfig::offline_mutations(),
            Preset::Logs => QueueConfig::log_shipping(),
        },
    };
    let mode = config.mode;
    let notifier: Arc<dyn Notifier> = if config.notify_offline {
        Arc::new(LogNotifier)
    } else {
        Arc::new(NoopNotifier)
    };

    // (A) ポートを用意
    let reachability = Arc::new(WatchReachability::new(args.offline_ms.is_none()));
    let queue = DeliveryQueueBuilder::new(config)
        .sender(Arc::new(FlakySender::new(args.fail_first)))
        .storage(Arc::new(FileStorage::new(&args.dir)))
        .reachability(reachability.clone())
        .notifier(notifier)
        .build()
        .context("failed to build delivery queue")?;
    let queue = Arc::new(queue);

    // (B) 前回の残りを復元して driver を起動
    let restored = queue.initialize_from_storage().await;
    info!(restored, dir = %args.dir.display(), "queue ready");
    let _subscription = queue.subscribe_sync_status(|update: spool_core::SyncUpdate| {
        println!(
            "sync: {:?} {}/{}",
            update.status, update.completed, update.total
        );
    });
    let driver = DeliveryDriver::spawn(Arc::clone(&queue));

    // (C) 投入
    for seq in 0..args.count {
        let line = LogLine {
            seq,
            message: format!("hello #{seq}"),
        };
        let payload = serde_json::to_value(&line)?;
        let id = match mode {
            DeliveryMode::Batch => queue.enqueue(LogLevel::Info, "spool-cli", payload).await?,
            DeliveryMode::Single => queue.enqueue("DEMO_MUTATION", "spool-cli", payload).await?,
        };
        info!(entry_id = %id, "enqueued");
    }

    if let Some(offline_ms) = args.offline_ms {
        sleep(Duration::from_millis(offline_ms)).await;
        reachability.set_online(true);
    }

    // (D) 明示的に flush して、retry が落ち着くまで待つ
    let outcome = queue.flush_now().await;
    info!(?outcome, "explicit flush");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    while queue.queue_length() > 0 && tokio::time::Instant::now() < deadline {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = sleep(Duration::from_millis(200)) => {}
        }
    }

    println!("{}", serde_json::to_string_pretty(&queue.stats())?);

    // (E) 終了: 最後の 1 回だけ送って、残りはディスクに残す
    let outcome = driver.shutdown_and_join().await;
    info!(?outcome, pending = queue.queue_length(), "shutdown");
    Ok(())
}
