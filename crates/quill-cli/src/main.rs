use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, bail};
use async_trait::async_trait;
use clap::Parser;
use tokio::time::{Duration, sleep};

use quill_core::domain::{CommentId, CommentRecord, CreateCommentRequest, QueueId};
use quill_core::impls::InMemoryCommentStore;
use quill_core::ports::CommentCreator;
use quill_core::queue::{CommentQueue, QueueItem, QueueService, QueueStatusView};
use quill_core::{CreateCommentError, QueueConfig};

/// Queue a batch of comments in-process and poll them to completion.
#[derive(Parser, Debug)]
#[command(name = "quill", version)]
struct Args {
    /// TOML file with sweep_interval_secs / stuck_after_secs / retention_secs
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of top-level comments to queue
    #[arg(long, default_value_t = 3)]
    comments: usize,

    /// Replies queued under the first comment once it has been created
    #[arg(long, default_value_t = 2)]
    replies: usize,

    /// Make the first N creations fail
    #[arg(long, default_value_t = 0)]
    failures: u32,

    /// Status poll interval in milliseconds
    #[arg(long, default_value_t = 50)]
    poll_ms: u64,
}

/// InMemoryCommentStore の前に「わざと失敗する」層をかぶせる
struct FlakyCreator {
    inner: InMemoryCommentStore,
    remaining_failures: AtomicU32,
}

#[async_trait]
impl CommentCreator for FlakyCreator {
    async fn create(&self, request: &CreateCommentRequest) -> Result<CommentRecord, CreateCommentError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(CreateCommentError::Storage(format!(
                "intentional failure (left={left})"
            )));
        }
        self.inner.create(request).await
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,quill_core=debug")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => QueueConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => QueueConfig::default(),
    };

    let creator = Arc::new(FlakyCreator {
        inner: InMemoryCommentStore::new(),
        remaining_failures: AtomicU32::new(args.failures),
    });
    let service = QueueService::builder(creator).config(config).start()?;
    let poll = Duration::from_millis(args.poll_ms);

    // (A) トップレベルのコメントを投入
    let mut ids = Vec::with_capacity(args.comments);
    for n in 1..=args.comments {
        let req = CreateCommentRequest::new(
            format!("visitor{n}"),
            format!("visitor{n}@example.com"),
            format!("comment #{n}"),
        );
        let response = service.enqueue_response(req)?;
        tracing::info!(queue_id = %response.queue_id, "enqueued");
        ids.push(response.queue_id);
    }

    // (B) 最初のコメントが作られたら、その下に返信を投入
    if args.replies > 0
        && let Some(first) = ids.first().copied()
    {
        let first = wait_terminal(&service, first, poll).await?;
        match first.result() {
            Some(parent) => {
                let parent_id: CommentId = parent.id;
                for n in 1..=args.replies {
                    let req = CreateCommentRequest::new(
                        format!("replier{n}"),
                        format!("replier{n}@example.com"),
                        format!("reply #{n}"),
                    )
                    .reply_to(parent_id);
                    ids.push(service.enqueue(req)?);
                }
            }
            None => tracing::warn!(
                error = first.error_message().unwrap_or_default(),
                "first comment failed; skipping replies"
            ),
        }
    }

    // (C) 全件が終わるまでポーリング
    for id in &ids {
        wait_terminal(&service, *id, poll).await?;
    }

    let views = ids
        .iter()
        .map(|id| service.status_view(*id))
        .collect::<Result<Vec<QueueStatusView>, _>>()?;
    println!("{}", serde_json::to_string_pretty(&views)?);
    let counts = service.counts();
    println!("counts: {}", serde_json::to_string(&counts)?);
    tracing::info!(total = counts.total(), failed = counts.failed, "all queued comments finished");

    service.shutdown().await;
    Ok(())
}

async fn wait_terminal(queue: &dyn CommentQueue, id: QueueId, poll: Duration) -> anyhow::Result<QueueItem> {
    for _ in 0..10_000 {
        let item = queue.get_status(id).await?;
        if item.is_terminal() {
            return Ok(item);
        }
        sleep(poll).await;
    }
    bail!("queue item {id} did not finish in time")
}
