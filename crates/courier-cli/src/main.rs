use anyhow::Context;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::{Duration, sleep};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use courier_core::impls::InMemoryTaskQueue;
use courier_core::ports::TaskQueue;
use courier_core::{
    AppBuilder, CourierConfig, CourierError, CourierResult, Event, EventHandler, EventListener,
    Task, TaskOptions, TaskParams,
};

#[derive(Parser)]
#[command(name = "courier", about = "Queue-backed event / task dispatch")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an in-memory produce → fan-out → worker cycle
    Demo {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a config file and print the queue routing table
    CheckConfig { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OrderPlaced {
    order_id: String,
    total_cents: u64,
}

impl Event for OrderPlaced {
    const TYPE: &'static str = "demo.order.placed.v1";
    type Handler = OrderPlacedHandler;
}

struct OrderPlacedHandler;

#[async_trait]
impl EventHandler<OrderPlaced> for OrderPlacedHandler {
    const NAME: &'static str = "OrderPlacedHandler";

    async fn handle(&self, event: OrderPlaced) -> CourierResult<()> {
        println!("handler: order {} placed ({} cents)", event.order_id, event.total_cents);
        Ok(())
    }
}

struct SendReceipt;

#[async_trait]
impl EventListener<OrderPlaced> for SendReceipt {
    const NAME: &'static str = "SendReceipt";

    async fn on_event(&self, event: OrderPlaced) -> CourierResult<()> {
        println!("listener: receipt sent for {}", event.order_id);
        Ok(())
    }
}

/// 最初の数回は失敗する（キュー側のリトライを想定）
struct UpdateSearchIndex {
    remaining_failures: AtomicU32,
}

#[async_trait]
impl EventListener<OrderPlaced> for UpdateSearchIndex {
    const NAME: &'static str = "UpdateSearchIndex";

    async fn on_event(&self, event: OrderPlaced) -> CourierResult<()> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(CourierError::execution(format!(
                "search index offline (left={left})"
            )));
        }
        println!("listener: search index updated for {}", event.order_id);
        Ok(())
    }
}

struct RebuildReport;

#[async_trait]
impl Task for RebuildReport {
    const TYPE: &'static str = "demo.reports.rebuild.v1";

    async fn execute(&self, params: TaskParams) -> CourierResult<()> {
        let year = params.get_int("year")?.unwrap_or_default();
        println!("task: report rebuilt for {year}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Demo { config } => demo(config).await,
        Command::CheckConfig { path } => check_config(path),
    }
}

fn check_config(path: PathBuf) -> anyhow::Result<()> {
    let config = CourierConfig::load(&path)
        .with_context(|| format!("checking {}", path.display()))?;

    println!("default_queue   = {}", config.default_queue);
    println!("worker_endpoint = {}", config.worker_endpoint);
    if config.queues.is_empty() {
        println!("(no queue routes)");
    }
    for (key, queue) in &config.queues {
        println!("  {key} -> {queue}");
    }
    Ok(())
}

async fn demo(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => CourierConfig::load(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CourierConfig::default(),
    };

    // (A) in-memory キューとアプリを用意
    let queue = Arc::new(InMemoryTaskQueue::new());
    let app = AppBuilder::new()
        .config(config)
        .in_memory(queue.clone())
        .register_event::<OrderPlaced>(OrderPlacedHandler)?
        .register_listener::<OrderPlaced, _>(SendReceipt)
        .register_listener::<OrderPlaced, _>(UpdateSearchIndex {
            remaining_failures: AtomicU32::new(1),
        })
        .register_task(RebuildReport)?
        .expect_components(&[OrderPlaced::TYPE, RebuildReport::TYPE])
        .build()?;

    // (B) producer: Event 1 件と、同名 Task 2 件（fan-in で 1 件になる）
    app.event_bus()
        .fire(OrderPlaced {
            order_id: "A-1001".into(),
            total_cents: 4_250,
        })
        .await?;

    let mut scheduler = app.scheduler();
    for _ in 0..2 {
        scheduler.add(
            TaskOptions::task::<RebuildReport>()
                .param("year", "2024")
                .delay(200)
                .named("rebuild-2024"),
        );
    }
    scheduler.flush().await?;
    info!(waiting = queue.len(), "produced");

    // (C) worker: 空になるまで配送する。失敗した item は再 enqueue（キュー側のリトライ相当）
    let mut delivered = 0usize;
    while !queue.is_empty() {
        let ready = queue.drain_ready();
        if ready.is_empty() {
            sleep(Duration::from_millis(50)).await;
            continue;
        }
        for queued in ready {
            delivered += 1;
            if let Err(err) = app.worker().handle_item(&queued.item).await {
                warn!(id = %queued.id, error = %err, "delivery failed, retrying");
                let retry = queued.item.clone().with_name(None);
                queue.enqueue(retry).await?;
            }
        }
    }

    println!("done: {delivered} deliveries");
    Ok(())
}
