//! Looks a CEP up in two APIs at once and prints whichever answers first
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use eyre::{Result, WrapErr};
use quote_race_core::{RaceSettings, Settings};
use quote_race_engine::{http_client, Address, Cep, CepLookup, LookupResult};
use tracing::warn;

/// Race the apicep CDN against ViaCEP for one CEP
#[derive(Debug, Parser)]
#[command(name = "cep-race", version)]
struct Opts {
    /// CEP to look up, e.g. `01001-000` (prompted for when missing)
    cep: Option<String>,

    /// Settings file (default: search `quote-race.toml` upwards)
    #[arg(long, env = "QR_CONFIG")]
    config: Option<PathBuf>,

    /// Overall deadline in milliseconds
    #[arg(long)]
    deadline_ms: Option<u64>,
    /// Let a failed lookup win with an empty answer
    #[arg(long)]
    lenient: bool,
    /// Base URL of the apicep CDN
    #[arg(long)]
    apicep_base: Option<String>,
    /// Base URL of ViaCEP
    #[arg(long)]
    viacep_base: Option<String>,
}

impl Opts {
    fn settings(&self) -> Result<RaceSettings> {
        let settings = match &self.config {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };
        let mut race = settings.race;

        if let Some(deadline) = self.deadline_ms {
            race.deadline_ms = deadline;
        }
        if self.lenient {
            race.strict = false;
        }
        if let Some(base) = &self.apicep_base {
            race.apicep_base = base.clone();
        }
        if let Some(base) = &self.viacep_base {
            race.viacep_base = base.clone();
        }
        Ok(race)
    }
}

fn prompt() -> Result<String> {
    print!("Enter a CEP: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .wrap_err("Error reading input")?;
    Ok(line.trim().to_owned())
}

#[tokio::main]
async fn main() -> Result<()> {
    quote_race_core::init_logging();
    let opts = Opts::parse();
    let settings = opts.settings()?;

    let input = match opts.cep {
        Some(cep) => cep,
        None => prompt()?,
    };
    let cep = Cep::parse(&input)?;

    let lookup = CepLookup::from_settings(http_client(None)?, &settings);
    match lookup.lookup(&cep).await {
        LookupResult::Found(Address::ApiCep(address)) => {
            println!("Received data from CDN apicep: {address:?}")
        }
        LookupResult::Found(Address::ViaCep(address)) => {
            println!("Received data from ViaCEP: {address:?}")
        }
        LookupResult::Undecodable { winner, reason, .. } => {
            warn!(task = %winner, %reason, "the first answer is not an address");
        }
        LookupResult::TimedOut => println!("Timeout: Both API requests took too long."),
    }
    Ok(())
}
