//! Todo sync example binary
//!
//! Loads a todo list through the fetch middleware and prints the result.
//! With `--metrics-addr`, a Prometheus recorder is installed first and the
//! exposition is printed once the load settles.

use anyhow::Context;
use clap::Parser;
use composable_fetch_runtime::metrics::MetricsServer;
use std::net::SocketAddr;
use todo_sync::{SyncStatus, load_todos, todo_store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "todo-sync", about = "Load a todo list through the fetch middleware")]
struct Args {
    /// Endpoint serving a JSON array of todos
    #[arg(default_value = "https://jsonplaceholder.typicode.com/todos")]
    url: String,

    /// How many todos to print
    #[arg(short, long, default_value_t = 10)]
    limit: usize,

    /// Install a Prometheus recorder for this address and print the metrics
    #[arg(long, value_name = "ADDR")]
    metrics_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_sync=info,composable_fetch_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics = match args.metrics_addr {
        Some(addr) => {
            let mut server = MetricsServer::new(addr);
            server.start().context("starting the metrics recorder")?;
            Some(server)
        },
        None => None,
    };

    let store = todo_store();

    println!(">>> Loading todos from {}", args.url);
    store
        .dispatch(load_todos(args.url.as_str()))
        .context("dispatching the load")?
        .settle()
        .await
        .context("loading todos")?;

    let state = store.get_state();
    match &state.status {
        SyncStatus::Loaded => {
            println!(
                "Loaded {} todos ({} remaining)\n",
                state.todos.len(),
                state.remaining()
            );
            for todo in state.todos.iter().take(args.limit) {
                let mark = if todo.completed { 'x' } else { ' ' };
                println!("  [{mark}] #{:<4} {}", todo.id, todo.title);
            }
        },
        SyncStatus::Failed(reason) => anyhow::bail!("load failed: {reason}"),
        other => anyhow::bail!("load did not complete: {other:?}"),
    }

    if let Some(server) = &metrics {
        if let Some(exposition) = server.render() {
            println!("\n>>> Metrics for {}\n{exposition}", server.addr());
        }
    }

    Ok(())
}
