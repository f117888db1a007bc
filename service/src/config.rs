use clap::builder::TypedValueParser as _;
use clap::Args;
use log::LevelFilter;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Core service used for tenant provider configuration when none is given.
pub const DEFAULT_CORE_CONNECTION_URI: &str = "http://localhost:3567";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl fmt::Display for RustEnvParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected one of development, production, staging")
    }
}

impl std::error::Error for RustEnvParseError {}

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Host settings. Every flag can also be set through the environment or a `.env` file.
#[derive(Clone, Debug, Args)]
pub struct Config {
    /// Base URL of the core service holding per-tenant provider configuration
    #[arg(long, env, default_value = DEFAULT_CORE_CONNECTION_URI)]
    core_connection_uri: String,

    /// API key sent to the core service in the `api-key` header
    #[arg(long, env, hide_env_values = true)]
    core_api_key: Option<String>,

    /// Path to a JSON array of static provider configurations
    #[arg(long, env)]
    providers_file: Option<PathBuf>,

    /// Timeout in seconds for each upstream HTTP request
    #[arg(long, env)]
    http_timeout_secs: Option<u64>,

    /// Retries on transient upstream failures, with exponential backoff
    #[arg(long, env, default_value_t = 0)]
    pub http_max_retries: u32,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .try_map(|s| s.parse::<LevelFilter>()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
        short,
        long,
        env,
        default_value_t = RustEnv::Development,
        value_parser = clap::builder::PossibleValuesParser::new([
            "DEVELOPMENT", "PRODUCTION", "STAGING",
            "development", "production", "staging"
        ])
            .try_map(|s| s.parse::<RustEnv>()),
        )]
    pub runtime_env: RustEnv,
}

impl Config {
    /// Load the `.env` file, if any, so clap can read its variables.
    pub fn load_dotenv() {
        dotenvy::dotenv().ok();
    }

    pub fn core_connection_uri(&self) -> &str {
        &self.core_connection_uri
    }

    pub fn set_core_connection_uri(mut self, core_connection_uri: String) -> Self {
        self.core_connection_uri = core_connection_uri;
        self
    }

    pub fn core_api_key(&self) -> Option<String> {
        self.core_api_key.clone()
    }

    pub fn providers_file(&self) -> Option<&Path> {
        self.providers_file.as_deref()
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
