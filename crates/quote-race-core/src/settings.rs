use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::Strictness;

/// Name of the settings file searched from the current directory upwards
pub const SETTINGS_FILE: &str = "quote-race.toml";

/// Errors while loading [`Settings`]
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading the settings file failed
    #[error("could not read {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// The settings file is not valid TOML for [`Settings`]
    #[error("could not parse {path}: {source}")]
    Parse {
        /// File that could not be parsed
        path: PathBuf,
        /// Underlying error
        source: toml::de::Error,
    },
    /// An environment override holds a value that does not parse
    #[error("environment variable {var} has an invalid value {value:?}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: OsString,
    },
}

/// Settings shared by the server and the command line programs
#[derive(Clone, Deserialize, Default, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    /// File the settings were read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,

    /// Quote server settings
    pub server: ServerSettings,
    /// Quote client settings
    pub client: ClientSettings,
    /// Race settings
    pub race: RaceSettings,
}

/// Settings of the quote server
#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerSettings {
    /// Host to listen on
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Number of HTTP worker threads (0 is treated as 1)
    pub threads: u32,
    /// SQLite database file
    pub database: PathBuf,
    /// Flat file receiving one line per served quote
    pub ledger: PathBuf,
    /// Base URL of the quote API
    pub upstream: String,
    /// Time budget in milliseconds for fetching and persisting one quote
    pub fetch_budget_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 8080,
            threads: 4,
            database: PathBuf::from("quotes.db"),
            ledger: PathBuf::from("cotacao.txt"),
            upstream: String::from("https://economia.awesomeapi.com.br"),
            fetch_budget_ms: 200,
        }
    }
}

impl ServerSettings {
    /// Number of HTTP worker threads to start, at least one
    #[inline]
    pub fn worker_threads(&self) -> u32 {
        self.threads.max(1)
    }

    /// The fetch budget as a [`Duration`]
    #[inline]
    pub fn fetch_budget(&self) -> Duration {
        Duration::from_millis(self.fetch_budget_ms)
    }
}

/// Settings of the quote client
#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClientSettings {
    /// Base URL of the quote server
    pub server_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// File the received quote is written to
    pub output: PathBuf,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: String::from("http://localhost:8080"),
            timeout_ms: 300,
            output: PathBuf::from("cotacao.txt"),
        }
    }
}

impl ClientSettings {
    /// The request timeout as a [`Duration`]
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Settings of the CEP race
#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "kebab-case", default)]
pub struct RaceSettings {
    /// Race deadline in milliseconds
    pub deadline_ms: u64,
    /// Whether a failed task forfeits instead of reporting an empty payload
    pub strict: bool,
    /// Base URL of the apicep CDN
    pub apicep_base: String,
    /// Base URL of ViaCEP
    pub viacep_base: String,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            deadline_ms: 1000,
            strict: true,
            apicep_base: String::from("https://cdn.apicep.com"),
            viacep_base: String::from("https://viacep.com.br"),
        }
    }
}

impl RaceSettings {
    /// The deadline as a [`Duration`]
    #[inline]
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// The configured [`Strictness`]
    #[inline]
    pub fn strictness(&self) -> Strictness {
        if self.strict {
            Strictness::Strict
        } else {
            Strictness::Lenient
        }
    }
}

impl Settings {
    /// Load the settings
    ///
    /// Searches for [`SETTINGS_FILE`] in the current directory and its
    /// ancestors. Without such a file, the defaults are used. Environment
    /// overrides are applied in both cases.
    pub fn load() -> Result<Self, SettingsError> {
        let cwd = std::env::current_dir().map_err(|source| SettingsError::Io {
            path: PathBuf::from("."),
            source,
        })?;

        let mut path = cwd;
        let mut settings = loop {
            path.push(SETTINGS_FILE);

            match std::fs::read_to_string(&path) {
                Ok(contents) => break Self::parse(&path, &contents)?,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(SettingsError::Io { path, source }),
            }

            path.pop();
            if !path.pop() {
                tracing::debug!("no {SETTINGS_FILE} found, using defaults");
                break Settings::default();
            }
        };

        settings.apply_env()?;
        Ok(settings)
    }

    /// Load the settings from the given file, then apply environment
    /// overrides
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_owned(),
            source,
        })?;
        let mut settings = Self::parse(path, &contents)?;
        settings.apply_env()?;
        Ok(settings)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings =
            toml::from_str(contents).map_err(|source| SettingsError::Parse {
                path: path.to_owned(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "loaded settings");
        settings.source = Some(path.to_owned());
        Ok(settings)
    }

    fn apply_env(&mut self) -> Result<(), SettingsError> {
        if let Some(v) = std::env::var_os("QR_DEADLINE_MS") {
            self.race.deadline_ms = v
                .to_str()
                .and_then(|s| s.parse().ok())
                .ok_or(SettingsError::InvalidEnv {
                    var: "QR_DEADLINE_MS",
                    value: v.clone(),
                })?;
        }

        if let Some(v) = std::env::var_os("QR_STRICT") {
            self.race.strict = v != "0"
                && !v.eq_ignore_ascii_case("false")
                && !v.eq_ignore_ascii_case("no")
                && !v.eq_ignore_ascii_case("off")
                && !v.eq_ignore_ascii_case("n")
                && !v.eq_ignore_ascii_case("f");
        }

        if let Some(v) = std::env::var_os("QR_SERVER_URL") {
            let Some(url) = v.to_str() else {
                return Err(SettingsError::InvalidEnv {
                    var: "QR_SERVER_URL",
                    value: v,
                });
            };
            self.client.server_url = url.to_owned();
        }

        Ok(())
    }
}
