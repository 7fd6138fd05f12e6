//! Asks the quote server for the current USD-BRL quote and writes it to a file
use std::path::PathBuf;

use clap::Parser;
use eyre::Result;
use quote_race_core::{ClientSettings, Settings};
use quote_race_engine::{http_client, QuoteClient, QuoteLedger};
use tracing::{info, warn};

/// Ask the quote server for the current USD-BRL quote
#[derive(Debug, Parser)]
#[command(name = "quote-client", version)]
struct Opts {
    /// Settings file (default: search `quote-race.toml` upwards)
    #[arg(long, env = "QR_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the quote server
    #[arg(long)]
    server_url: Option<String>,
    /// Give up after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// File the quote is written to
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Opts {
    fn settings(self) -> Result<ClientSettings> {
        let settings = match &self.config {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };
        let mut client = settings.client;

        if let Some(url) = self.server_url {
            client.server_url = url;
        }
        if let Some(timeout) = self.timeout_ms {
            client.timeout_ms = timeout;
        }
        if let Some(output) = self.output {
            client.output = output;
        }
        Ok(client)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    quote_race_core::init_logging();
    let settings = Opts::parse().settings()?;

    let client = QuoteClient::new(
        http_client(Some(settings.timeout()))?,
        settings.server_url.clone(),
        settings.timeout(),
    );
    let quote = client.get_quote().await?;
    info!("Valor atual do câmbio: {:.2}", quote.bid);

    let ledger = QuoteLedger::overwrite(&settings.output);
    match ledger.record(quote.bid) {
        Ok(()) => info!("Cotação salva no arquivo {}", ledger.path().display()),
        Err(err) => warn!("Erro ao escrever a cotação no arquivo: {err}"),
    }
    Ok(())
}
