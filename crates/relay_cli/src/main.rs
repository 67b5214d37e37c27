use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use core_types::DrawEntry;
use draw_predictor::{evaluate_all, window_blocks};
use feed_upstream::{body_preview, extract_records, HttpUpstream, UpstreamConfig};
use infra_clock::now_ms;
use record_mapper::map_records;
use rolling_cache::sort_newest_first;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "draw-relay", about = "Draw relay operations CLI", version)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch one page, then print what the relay would admit.
    Once(OnceArgs),
    /// Run the block tallies and heuristics over a newest-first digit list.
    Predict(PredictArgs),
}

#[derive(Args, Debug, Clone)]
struct OnceArgs {
    #[arg(long, env = "DRAWRELAY_UPSTREAM_URL")]
    url: Option<String>,
    #[arg(long, env = "DRAWRELAY_PAGE_SIZE")]
    page_size: Option<u32>,
    #[arg(long, env = "DRAWRELAY_TYPE_ID")]
    type_id: Option<i64>,
    #[arg(long, env = "DRAWRELAY_SIGNATURE")]
    signature: Option<String>,
    #[arg(long, env = "DRAWRELAY_TIMEOUT_MS", default_value_t = 10_000)]
    timeout_ms: u64,
    /// Also print the raw body preview on success.
    #[arg(long, default_value_t = false)]
    raw: bool,
}

#[derive(Args, Debug, Clone)]
struct PredictArgs {
    #[arg(required = true, value_parser = clap::value_parser!(u8).range(0..=9))]
    digits: Vec<u8>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt().with_env_filter(level).try_init();
    match cli.command {
        Commands::Once(args) => run_once(args).await,
        Commands::Predict(args) => run_predict(&args),
    }
}

fn upstream_config(args: &OnceArgs) -> UpstreamConfig {
    let mut cfg = UpstreamConfig::default();
    if let Some(url) = &args.url {
        cfg.url = url.trim().to_string();
    }
    if let Some(page_size) = args.page_size {
        cfg.page_size = page_size.clamp(1, 100);
    }
    if let Some(type_id) = args.type_id {
        cfg.type_id = type_id;
    }
    cfg.signature = args.signature.clone().filter(|s| !s.trim().is_empty());
    cfg.timeout = Duration::from_millis(args.timeout_ms.max(100));
    cfg
}

async fn run_once(args: OnceArgs) -> Result<()> {
    let cfg = upstream_config(&args);
    tracing::debug!(url = %cfg.url, page_size = cfg.page_size, "fetching one page");
    let upstream = HttpUpstream::new(cfg)?;
    let outcome = upstream.fetch_once().await;

    let raws = outcome
        .body
        .as_json()
        .map(extract_records)
        .unwrap_or_default();
    let batch = map_records(&raws, now_ms());
    let mut entries: Vec<DrawEntry> = batch.entries;
    sort_newest_first(&mut entries, |e| e.period.as_str());

    println!(
        "{}",
        json!({
            "status": outcome.status,
            "latencyMs": outcome.latency_ms,
            "extracted": raws.len(),
            "mapped": entries.len(),
            "rejected": batch.rejected,
        })
    );
    if args.raw || !outcome.is_success() {
        println!("{}", body_preview(&outcome.body.render(), 2_000));
    }
    for entry in &entries {
        println!("{}", serde_json::to_string(entry)?);
    }
    Ok(())
}

fn run_predict(args: &PredictArgs) -> Result<()> {
    let report = json!({
        "history": args.digits,
        "predictions": window_blocks(&args.digits),
        "heuristics": evaluate_all(&args.digits),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
