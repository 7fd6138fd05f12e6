//! Quote server: serves the current USD-BRL quote at `GET /cotacao`

#![warn(missing_docs)]

mod http;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use eyre::{eyre, Result, WrapErr};
use quote_race_core::{RequestHandler, ServerSettings, Settings};

/// Command line options
///
/// Every option overrides the corresponding `[server]` entry of the
/// settings file.
#[derive(Debug, Parser)]
#[command(name = "quote-server", version, about)]
struct Opts {
    /// Settings file (default: search `quote-race.toml` upwards)
    #[arg(long, env = "QR_CONFIG")]
    config: Option<PathBuf>,

    /// Host for the HTTP server to listen on
    #[arg(long)]
    host: Option<String>,
    /// Port for the HTTP server to listen on
    #[arg(long)]
    port: Option<u16>,
    /// Number of HTTP worker threads
    #[arg(long)]
    threads: Option<u32>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,
    /// File receiving one line per served quote
    #[arg(long)]
    ledger: Option<PathBuf>,
    /// Base URL of the quote API
    #[arg(long)]
    upstream: Option<String>,
    /// Time budget in milliseconds for fetching and storing one quote
    #[arg(long)]
    fetch_budget_ms: Option<u64>,
}

impl Opts {
    fn settings(self) -> Result<ServerSettings> {
        let settings = match &self.config {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };
        let mut server = settings.server;

        if let Some(host) = self.host {
            server.host = host;
        }
        if let Some(port) = self.port {
            server.port = port;
        }
        if let Some(threads) = self.threads {
            server.threads = threads;
        }
        if let Some(database) = self.database {
            server.database = database;
        }
        if let Some(ledger) = self.ledger {
            server.ledger = ledger;
        }
        if let Some(upstream) = self.upstream {
            server.upstream = upstream;
        }
        if let Some(budget) = self.fetch_budget_ms {
            server.fetch_budget_ms = budget;
        }
        Ok(server)
    }
}

fn http_loop<H: RequestHandler>(server: &tiny_http::Server, handler: &H) {
    loop {
        let rq = match server.recv() {
            Ok(rq) => rq,
            Err(err) => {
                tracing::warn!(%err, "HTTP receive failed");
                continue;
            }
        };
        if let Some(rq) = http::parse(rq) {
            handler.handle(rq);
        }
    }
}

fn main() -> Result<()> {
    quote_race_core::init_logging();
    let settings = Opts::parse().settings()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("quote-io")
        .build()
        .wrap_err("could not start the async runtime")?;
    let desk = quote_race_engine::launch(&settings, runtime.handle().clone())?;

    let server = tiny_http::Server::http((settings.host.as_str(), settings.port))
        .map_err(|err| eyre!("could not listen on {}:{}: {err}", settings.host, settings.port))?;
    tracing::info!("Servidor iniciado na porta {}", settings.port);

    let server = Arc::new(server);
    let desk = Arc::new(desk);
    let workers = (0..settings.worker_threads())
        .map(|i| {
            let server = server.clone();
            let desk = desk.clone();
            thread::Builder::new()
                .name(format!("http_{i}"))
                .spawn(move || http_loop(&server, &*desk))
        })
        .collect::<io::Result<Vec<_>>>()
        // Returning from `main` also ends the workers already started.
        .wrap_err("could not spawn an HTTP worker")?;

    for worker in workers {
        if worker.join().is_err() {
            tracing::error!("HTTP worker panicked");
        }
    }

    if let Some(desk) = Arc::into_inner(desk) {
        desk.shutdown();
    }
    Ok(())
}
