//! Postal code (CEP) lookup racing two public APIs
use std::fmt;
use std::str::FromStr;

use quote_race_core::{Payload, RaceOutcome, RaceSettings, TaskId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::http_task::HttpFetchTask;
use crate::race::RaceFetcher;

/// Number of digits in a CEP
const CEP_LEN: usize = 8;

/// Why a CEP was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CepError {
    /// Not exactly eight characters once the hyphens are gone
    #[error("Invalid CEP: {input} (expected 8 digits, got {len})")]
    InvalidLength {
        /// The input as given
        input: String,
        /// Length after removing hyphens
        len: usize,
    },
    /// Contains something other than digits and hyphens
    #[error("Invalid CEP: {input} (only digits and '-' are allowed)")]
    NotNumeric {
        /// The input as given
        input: String,
    },
}

/// A Brazilian postal code: exactly eight ASCII digits
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Cep(String);

impl Cep {
    /// Parse user input such as `01001-000` or `01001000`
    ///
    /// Every `-` is ignored, surrounding whitespace too.
    pub fn parse(input: &str) -> Result<Self, CepError> {
        let digits: String = input.trim().chars().filter(|&c| c != '-').collect();
        let len = digits.chars().count();
        if len != CEP_LEN {
            return Err(CepError::InvalidLength {
                input: input.to_owned(),
                len,
            });
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CepError::NotNumeric {
                input: input.to_owned(),
            });
        }
        Ok(Self(digits))
    }

    /// The eight digits, e.g. `01001000`
    #[inline]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// The usual written form, e.g. `01001-000`
    pub fn hyphenated(&self) -> String {
        format!("{}-{}", &self.0[..5], &self.0[5..])
    }
}

impl FromStr for Cep {
    type Err = CepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Cep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hyphenated())
    }
}

/// Address as answered by the apicep CDN
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiCepAddress {
    pub code: String,
    pub state: String,
    pub city: String,
    pub district: String,
    pub address: String,
    pub status: i64,
    pub ok: bool,
    pub status_text: String,
}

/// Address as answered by ViaCEP
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default, Debug)]
#[serde(default)]
pub struct ViaCepAddress {
    pub cep: String,
    pub logradouro: String,
    pub complemento: String,
    pub bairro: String,
    pub localidade: String,
    pub uf: String,
    pub ibge: String,
    pub gia: String,
    pub ddd: String,
    pub siafi: String,
}

/// Address from whichever API won
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Address {
    /// Answer of the apicep CDN (task A)
    ApiCep(ApiCepAddress),
    /// Answer of ViaCEP (task B)
    ViaCep(ViaCepAddress),
}

impl Address {
    /// Human readable name of the API that answered
    pub fn source(&self) -> &'static str {
        match self {
            Address::ApiCep(_) => "CDN apicep",
            Address::ViaCep(_) => "ViaCEP",
        }
    }
}

/// Result of a CEP lookup
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LookupResult {
    /// The winning API answered with a decodable address
    Found(Address),
    /// The winning API answered with something that is not an address
    ///
    /// In lenient mode this is also how a failed winner shows up (with an
    /// empty payload).
    Undecodable {
        /// Winning task
        winner: TaskId,
        /// What it answered
        payload: Payload,
        /// Decoder message
        reason: String,
    },
    /// Neither API answered before the deadline
    TimedOut,
}

/// Base URLs of both APIs
#[derive(Clone, Debug)]
pub struct CepEndpoints {
    pub apicep_base: String,
    pub viacep_base: String,
}

impl Default for CepEndpoints {
    fn default() -> Self {
        let settings = RaceSettings::default();
        Self {
            apicep_base: settings.apicep_base,
            viacep_base: settings.viacep_base,
        }
    }
}

impl CepEndpoints {
    /// URL of the apicep CDN file for `cep`
    pub fn apicep_url(&self, cep: &Cep) -> String {
        format!(
            "{}/file/apicep/{}.json",
            self.apicep_base.trim_end_matches('/'),
            cep.hyphenated()
        )
    }

    /// URL of the ViaCEP lookup for `cep`
    pub fn viacep_url(&self, cep: &Cep) -> String {
        format!(
            "{}/ws/{}/json/",
            self.viacep_base.trim_end_matches('/'),
            cep.digits()
        )
    }
}

/// Looks a CEP up in both APIs at once and keeps the first answer
#[derive(Clone, Debug)]
pub struct CepLookup {
    client: reqwest::Client,
    endpoints: CepEndpoints,
    fetcher: RaceFetcher,
}

impl CepLookup {
    /// Create a lookup from its parts
    pub fn new(client: reqwest::Client, endpoints: CepEndpoints, fetcher: RaceFetcher) -> Self {
        Self {
            client,
            endpoints,
            fetcher,
        }
    }

    /// Create a lookup as described by `settings`
    pub fn from_settings(client: reqwest::Client, settings: &RaceSettings) -> Self {
        let endpoints = CepEndpoints {
            apicep_base: settings.apicep_base.clone(),
            viacep_base: settings.viacep_base.clone(),
        };
        let fetcher = RaceFetcher::new(settings.deadline()).with_strictness(settings.strictness());
        Self::new(client, endpoints, fetcher)
    }

    /// Race both APIs for `cep`
    pub async fn lookup(&self, cep: &Cep) -> LookupResult {
        let task_a =
            HttpFetchTask::new(self.client.clone(), self.endpoints.apicep_url(cep)).expect_json();
        let task_b =
            HttpFetchTask::new(self.client.clone(), self.endpoints.viacep_url(cep)).expect_json();
        debug!(%cep, deadline = ?self.fetcher.deadline(), "looking up CEP");

        match self.fetcher.race(task_a, task_b).await {
            RaceOutcome::TimedOut => LookupResult::TimedOut,
            RaceOutcome::WonBy(winner, payload) => {
                let decoded = match winner {
                    TaskId::A => serde_json::from_str(payload.as_str()).map(Address::ApiCep),
                    TaskId::B => serde_json::from_str(payload.as_str()).map(Address::ViaCep),
                };
                match decoded {
                    Ok(address) => {
                        info!(%cep, source = address.source(), "CEP found");
                        LookupResult::Found(address)
                    }
                    Err(err) => LookupResult::Undecodable {
                        winner,
                        payload,
                        reason: err.to_string(),
                    },
                }
            }
        }
    }
}
