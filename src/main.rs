//! Memscript server — batch-script execution over a knowledge graph

use clap::Parser;
use memscript_engine::{Engine, EngineConfig};
use memscript_gateway::AppState;
use memscript_graph::{load_graph, MemoryStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "memscript",
    about = "Runs agent batch scripts against an in-memory knowledge graph"
)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "18790")]
    port: u16,

    /// Bind address: "loopback" or "lan"
    #[arg(short, long, default_value = "loopback")]
    bind: String,

    /// Graph file loaded at startup (missing file starts empty)
    #[arg(short, long)]
    graph_file: Option<PathBuf>,

    /// Default script budget in milliseconds
    #[arg(long, default_value = "30000")]
    timeout_ms: u64,

    /// Captured output line cap per script
    #[arg(long, default_value = "10000")]
    max_output_lines: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memscript=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let graph = match &cli.graph_file {
        Some(path) => load_graph(path)?,
        None => {
            tracing::info!("no graph file given, starting empty");
            Default::default()
        }
    };

    let store = Arc::new(MemoryStore::with_graph(graph));
    let engine = Engine::with_config(
        store,
        EngineConfig {
            default_timeout_ms: cli.timeout_ms,
            max_output_lines: cli.max_output_lines,
        },
    );

    let host = bind_host(&cli.bind)?;
    let addr: SocketAddr = format!("{}:{}", host, cli.port).parse()?;

    let state = Arc::new(AppState {
        engine,
        started_at: std::time::Instant::now(),
    });
    memscript_gateway::start_gateway(addr, state).await
}

/// Only the two named modes bind; a typo must not widen the listen address.
fn bind_host(mode: &str) -> anyhow::Result<&'static str> {
    match mode {
        "loopback" | "localhost" | "127.0.0.1" => Ok("127.0.0.1"),
        "lan" | "0.0.0.0" => Ok("0.0.0.0"),
        other => anyhow::bail!(
            "unknown bind mode {:?}, expected \"loopback\" or \"lan\"",
            other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_modes_resolve_to_their_addresses() {
        assert_eq!(bind_host("loopback").unwrap(), "127.0.0.1");
        assert_eq!(bind_host("localhost").unwrap(), "127.0.0.1");
        assert_eq!(bind_host("lan").unwrap(), "0.0.0.0");
    }

    #[test]
    fn misspelled_bind_mode_is_rejected() {
        assert!(bind_host("lopback").is_err());
        assert!(bind_host("").is_err());
    }
}
