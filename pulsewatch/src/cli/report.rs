//! check / history / uptime サブコマンド

use super::{parse_endpoint_id, print_json, GlobalOptions};
use crate::registry::EndpointRegistry;
use crate::types::{Observation, Uptime};
use anyhow::anyhow;
use clap::Args;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

/// history のデフォルト件数
const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// uptime のデフォルト集計期間（時間）
const DEFAULT_UPTIME_WINDOW_HOURS: u64 = 24;

/// check サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Endpoint ID
    #[arg(value_parser = parse_endpoint_id)]
    pub id: Uuid,
}

/// history サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Endpoint ID
    #[arg(value_parser = parse_endpoint_id)]
    pub id: Uuid,

    /// Maximum number of observations to show
    #[arg(short, long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub limit: u32,
}

/// uptime サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct UptimeArgs {
    /// Endpoint ID
    #[arg(value_parser = parse_endpoint_id)]
    pub id: Uuid,

    /// Trailing window in hours
    #[arg(short, long, default_value_t = DEFAULT_UPTIME_WINDOW_HOURS)]
    pub window_hours: u64,
}

#[derive(Debug, Serialize)]
struct UptimeReport {
    endpoint_id: Uuid,
    window_hours: u64,
    uptime_percent: Option<f64>,
}

/// check コマンドを実行
pub async fn check(args: &CheckArgs, options: &GlobalOptions) -> Result<(), anyhow::Error> {
    let ctx = options.open().await?;
    let observation = ctx.monitor.record_manual_check(args.id).await?;

    if options.json {
        print_json(&observation)?;
    } else {
        println!("{}", format_observation(&observation));
    }
    Ok(())
}

/// history コマンドを実行
pub async fn history(args: &HistoryArgs, options: &GlobalOptions) -> Result<(), anyhow::Error> {
    let ctx = options.open().await?;
    ensure_exists(&ctx.registry, args.id).await?;
    let observations = ctx.monitor.get_history(args.id, args.limit).await?;

    if options.json {
        print_json(&observations)?;
    } else if observations.is_empty() {
        println!("No observations recorded for {}", args.id);
    } else {
        for observation in &observations {
            println!("{}", format_observation(observation));
        }
    }
    Ok(())
}

/// uptime コマンドを実行
pub async fn uptime(args: &UptimeArgs, options: &GlobalOptions) -> Result<(), anyhow::Error> {
    if args.window_hours == 0 {
        return Err(anyhow!("--window-hours must be greater than 0"));
    }

    let ctx = options.open().await?;
    ensure_exists(&ctx.registry, args.id).await?;
    let window = Duration::from_secs(args.window_hours * 3600);
    let uptime = ctx.monitor.get_uptime(args.id, window).await?;

    if options.json {
        print_json(&UptimeReport {
            endpoint_id: args.id,
            window_hours: args.window_hours,
            uptime_percent: uptime.percent(),
        })?;
    } else {
        match uptime {
            Uptime::Percent(_) => println!("{}%", uptime),
            Uptime::NotAvailable => println!("{}", uptime),
        }
    }
    Ok(())
}

async fn ensure_exists(registry: &dyn EndpointRegistry, id: Uuid) -> Result<(), anyhow::Error> {
    registry
        .get_endpoint(id)
        .await?
        .map(|_| ())
        .ok_or_else(|| anyhow!("endpoint {} not found", id))
}

/// 監視結果を1行で表示
fn format_observation(observation: &Observation) -> String {
    let latency = observation
        .latency_ms
        .map(|ms| format!("{} ms", ms))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}\t{}\t{}\t{}",
        observation.observed_at.format("%Y-%m-%d %H:%M:%S UTC"),
        observation.status,
        latency,
        observation.detail
    )
}
