use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde::Serialize;
use shard_router::{
    BalancerRole, Node, PickSource, RequestMetadata, Router, RouterConfig, route_key,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shard-router")]
#[command(about = "Sticky shard routing tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run picks for a range of objects and print where they landed
    Simulate {
        /// Candidate node as addr[=weight][@color], repeatable
        #[arg(long = "node")]
        nodes: Vec<String>,
        /// JSON file holding an array of nodes
        #[arg(long)]
        nodes_file: Option<PathBuf>,
        #[arg(long, default_value = "game")]
        service: String,
        #[arg(long, default_value = "player")]
        table: String,
        #[arg(long, default_value = "master")]
        role: String,
        /// Process color; requests and untagged nodes fall back to it
        #[arg(long, default_value = "local")]
        color: String,
        #[arg(long, default_value_t = 100)]
        objects: i64,
        /// How many times every object is picked
        #[arg(long, default_value_t = 1)]
        rounds: u32,
        /// Use a Redis route store instead of the in-memory one
        #[arg(long)]
        redis_url: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print the store key of an object route
    Key {
        #[arg(long)]
        table: String,
        #[arg(long)]
        color: String,
        #[arg(long)]
        oid: i64,
    },
}

#[derive(Debug, Default, Serialize)]
struct SimulationSummary {
    picks: usize,
    errors: usize,
    by_node: BTreeMap<String, usize>,
    by_source: BTreeMap<String, usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Simulate {
            nodes,
            nodes_file,
            service,
            table,
            role,
            color,
            objects,
            rounds,
            redis_url,
            json,
        } => {
            let mut candidates = nodes
                .iter()
                .map(|raw| parse_node(raw))
                .collect::<Result<Vec<_>>>()?;
            if let Some(path) = nodes_file {
                let raw = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read '{}'", path.display()))?;
                let loaded: Vec<Node> = serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse nodes from '{}'", path.display()))?;
                candidates.extend(loaded);
            }
            if candidates.is_empty() {
                return Err(anyhow!("No nodes given. Example: --node 10.0.0.1:9000=2@us"));
            }
            let candidates = candidates
                .into_iter()
                .map(|node| match node.color() {
                    Some(_) => node,
                    None => node.with_color(color.as_str()),
                })
                .collect();

            let mut config = RouterConfig::new(&table).color(&color);
            if let Some(url) = redis_url.as_deref() {
                config = config.store_url(url);
            }
            let role: BalancerRole = role.parse()?;

            let summary = simulate(config, &service, role, candidates, objects, rounds).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
            Ok(())
        }
        Command::Key { table, color, oid } => {
            println!("{}", route_key(&table, &color, oid));
            Ok(())
        }
    }
}

fn parse_node(raw: &str) -> Result<Node> {
    let (rest, color) = match raw.rsplit_once('@') {
        Some((rest, color)) => (rest, Some(color)),
        None => (raw, None),
    };
    let (address, weight) = match rest.split_once('=') {
        Some((address, weight)) => {
            let weight: f64 = weight
                .parse()
                .with_context(|| format!("Invalid weight in node '{}'", raw))?;
            (address, weight)
        }
        None => (rest, 1.0),
    };

    let mut node = Node::new(address.trim(), weight);
    if let Some(color) = color {
        node = node.with_color(color.trim());
    }
    node.validate()?;
    Ok(node)
}

async fn simulate(
    config: RouterConfig,
    service: &str,
    role: BalancerRole,
    nodes: Vec<Node>,
    objects: i64,
    rounds: u32,
) -> Result<SimulationSummary> {
    let router = Router::open(config).await?;
    router.discovery().set_nodes(service, nodes).await?;
    let conn = router.connect(service, role)?;

    let mut summary = SimulationSummary::default();
    for _ in 0..rounds {
        let picks = (0..objects).map(|oid| {
            let conn = &conn;
            async move { conn.select_detailed(&RequestMetadata::new().with_oid(oid)).await }
        });
        for result in join_all(picks).await {
            summary.picks += 1;
            match result {
                Ok(pick) => {
                    *summary
                        .by_node
                        .entry(pick.node.address().to_string())
                        .or_default() += 1;
                    *summary
                        .by_source
                        .entry(source_label(&pick.source).to_string())
                        .or_default() += 1;
                }
                Err(err) => {
                    summary.errors += 1;
                    tracing::warn!(error = %err, "pick failed");
                }
            }
        }
    }
    Ok(summary)
}

fn source_label(source: &PickSource) -> &'static str {
    match source {
        PickSource::Sticky => "sticky",
        PickSource::Selected => "selected",
        PickSource::Assigned => "assigned",
        PickSource::RaceLost { .. } => "race_lost",
    }
}

fn print_summary(summary: &SimulationSummary) {
    println!("picks: {}  errors: {}", summary.picks, summary.errors);
    println!("{:<32} {:>8} {:>8}", "node", "picks", "share");
    for (address, count) in &summary.by_node {
        let share = *count as f64 * 100.0 / summary.picks.max(1) as f64;
        println!("{:<32} {:>8} {:>7.2}%", address, count, share);
    }
    for (source, count) in &summary.by_source {
        println!("  {}: {}", source, count);
    }
}
