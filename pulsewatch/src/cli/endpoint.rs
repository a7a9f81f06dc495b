//! endpoint サブコマンド
//!
//! 監視対象エンドポイントの登録・一覧・一時停止・削除と通知先の管理。

use super::{parse_endpoint_id, print_json, GlobalOptions};
use crate::registry::{EndpointRegistry, SqliteEndpointRegistry};
use crate::store::ObservationStore;
use crate::types::{Endpoint, Observation};
use clap::{Args, Subcommand};
use serde::Serialize;
use uuid::Uuid;

/// endpoint サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct EndpointArgs {
    /// Endpoint operation
    #[command(subcommand)]
    pub command: EndpointCommand,
}

/// endpoint の操作
#[derive(Subcommand, Debug, Clone)]
pub enum EndpointCommand {
    /// Register a new endpoint
    Add {
        /// http(s) URL to monitor
        url: String,
        /// Notification destination (repeatable)
        #[arg(short, long)]
        destination: Vec<String>,
    },
    /// List endpoints with their latest status
    List,
    /// Stop scheduled checks for an endpoint
    Pause {
        /// Endpoint ID
        #[arg(value_parser = parse_endpoint_id)]
        id: Uuid,
    },
    /// Resume scheduled checks for an endpoint
    Resume {
        /// Endpoint ID
        #[arg(value_parser = parse_endpoint_id)]
        id: Uuid,
    },
    /// Delete an endpoint and all of its observations
    Delete {
        /// Endpoint ID
        #[arg(value_parser = parse_endpoint_id)]
        id: Uuid,
    },
    /// Show or edit notification destinations
    Destinations {
        /// Endpoint ID
        #[arg(value_parser = parse_endpoint_id)]
        id: Uuid,
        /// Destination to add (repeatable)
        #[arg(long)]
        add: Vec<String>,
        /// Destination to remove (repeatable)
        #[arg(long)]
        remove: Vec<String>,
    },
}

/// 一覧表示用のエンドポイント情報
#[derive(Debug, Serialize)]
struct EndpointSummary {
    #[serde(flatten)]
    endpoint: Endpoint,
    destinations: Vec<String>,
    latest: Option<Observation>,
}

/// endpoint コマンドを実行
pub async fn execute(args: &EndpointArgs, options: &GlobalOptions) -> Result<(), anyhow::Error> {
    let ctx = options.open().await?;
    let registry = &ctx.registry;

    match &args.command {
        EndpointCommand::Add { url, destination } => {
            let endpoint = registry.register(url).await?;
            for dest in destination {
                registry.add_destination(endpoint.id, dest).await?;
            }
            let summary = summarize(registry, &ctx.store, endpoint).await?;
            if options.json {
                print_json(&summary)?;
            } else {
                println!("Registered {} ({})", summary.endpoint.id, summary.endpoint.address);
                if !summary.destinations.is_empty() {
                    println!("Destinations: {}", summary.destinations.join(", "));
                }
            }
        }
        EndpointCommand::List => {
            let mut summaries = Vec::new();
            for endpoint in registry.list_endpoints().await? {
                summaries.push(summarize(registry, &ctx.store, endpoint).await?);
            }
            if options.json {
                print_json(&summaries)?;
            } else {
                print_table(&summaries);
            }
        }
        EndpointCommand::Pause { id } => {
            registry.set_paused(*id, true).await?;
            println!("Paused {}", id);
        }
        EndpointCommand::Resume { id } => {
            registry.set_paused(*id, false).await?;
            println!("Resumed {}", id);
        }
        EndpointCommand::Delete { id } => {
            registry.delete(*id).await?;
            println!("Deleted {}", id);
        }
        EndpointCommand::Destinations { id, add, remove } => {
            for dest in add {
                registry.add_destination(*id, dest).await?;
            }
            for dest in remove {
                registry.remove_destination(*id, dest).await?;
            }
            let destinations = registry.list_destinations(*id).await?;
            if options.json {
                print_json(&destinations)?;
            } else if destinations.is_empty() {
                println!("No notification destinations for {}", id);
            } else {
                for dest in destinations {
                    println!("{}", dest);
                }
            }
        }
    }

    Ok(())
}

async fn summarize(
    registry: &SqliteEndpointRegistry,
    store: &ObservationStore,
    endpoint: Endpoint,
) -> Result<EndpointSummary, anyhow::Error> {
    let destinations = registry.list_destinations(endpoint.id).await?;
    let latest = store.latest_for(endpoint.id).await;
    Ok(EndpointSummary {
        endpoint,
        destinations,
        latest,
    })
}

fn print_table(summaries: &[EndpointSummary]) {
    if summaries.is_empty() {
        println!("No endpoints registered");
        return;
    }
    println!("ID\t\t\t\t\tSTATE\tSTATUS\tLAST CHECK\t\t\tADDRESS");
    for summary in summaries {
        let state = if summary.endpoint.paused {
            "paused"
        } else {
            "active"
        };
        let (status, checked) = match &summary.latest {
            Some(obs) => (
                obs.status.as_str(),
                obs.observed_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ),
            None => ("-", "-".to_string()),
        };
        println!(
            "{}\t{}\t{}\t{}\t\t{}",
            summary.endpoint.id, state, status, checked, summary.endpoint.address
        );
    }
}
