use clap::{Args, Parser, Subcommand};
use log::{error, info};
use secrecy::SecretString;
use service::{config::Config, logging::Logger};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::path::Path;
use std::sync::Arc;
use thirdparty_auth::{
    http::{HttpClient, HttpClientBuilder, HttpClientConfig},
    oauth::{ProviderInput, RedirectUriInfo},
    querier::HttpCoreQuerier,
    ProviderConfig, ThirdParty,
};

/// Drive third-party sign-in flows from the terminal.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the provider URL to send the browser to and the PKCE verifier to keep
    Authorize {
        #[command(flatten)]
        target: Target,

        /// Redirect URI registered on the provider's dashboard
        #[arg(long)]
        redirect_uri: String,
    },
    /// Exchange the code from the callback and print the user's identity
    Callback {
        #[command(flatten)]
        target: Target,

        /// Redirect URI registered on the provider's dashboard
        #[arg(long)]
        redirect_uri: String,

        /// The `code` query parameter the provider redirected back with
        #[arg(long)]
        code: String,

        /// The verifier printed by `authorize`
        #[arg(long)]
        pkce_verifier: Option<String>,
    },
}

#[derive(Args)]
struct Target {
    /// Configured provider id, e.g. `google` or `github-enterprise`
    #[arg(long)]
    third_party_id: String,

    #[arg(long)]
    client_type: Option<String>,

    #[arg(long)]
    tenant_id: Option<String>,
}

#[tokio::main]
async fn main() {
    Config::load_dotenv();
    let cli = Cli::parse();
    if let Err(e) = Logger::init_logger(&cli.config) {
        eprintln!("Failed to start logger: {e}");
        std::process::exit(1);
    }

    match run(cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<String, Box<dyn StdError>> {
    let http = build_http_client(&cli.config)?;
    let recipe = build_recipe(&cli.config, http)?;

    let output = match cli.command {
        Command::Authorize {
            target,
            redirect_uri,
        } => {
            let redirect = recipe
                .get_authorisation_redirect_url(
                    &target.third_party_id,
                    target.client_type.as_deref(),
                    target.tenant_id.as_deref(),
                    &redirect_uri,
                )
                .await?;
            serde_json::to_string_pretty(&redirect)?
        }
        Command::Callback {
            target,
            redirect_uri,
            code,
            pkce_verifier,
        } => {
            let user_info = recipe
                .exchange_and_get_user_info(
                    &target.third_party_id,
                    target.client_type.as_deref(),
                    target.tenant_id.as_deref(),
                    RedirectUriInfo {
                        redirect_uri_on_provider_dashboard: redirect_uri,
                        redirect_uri_query_params: HashMap::from([("code".to_string(), code)]),
                        pkce_code_verifier: pkce_verifier,
                    },
                )
                .await?;
            serde_json::to_string_pretty(&user_info)?
        }
    };
    Ok(output)
}

fn build_http_client(config: &Config) -> Result<HttpClient, thirdparty_auth::Error> {
    HttpClientBuilder::from_config(HttpClientConfig {
        timeout: config.http_timeout(),
        max_retries: config.http_max_retries,
        ..Default::default()
    })
    .build()
}

fn build_recipe(config: &Config, http: HttpClient) -> Result<ThirdParty, Box<dyn StdError>> {
    let providers = match config.providers_file() {
        Some(path) => load_providers(path)?,
        None => Vec::new(),
    };
    info!(
        "Loaded {} static providers, core at {}",
        providers.len(),
        config.core_connection_uri()
    );

    let mut querier = HttpCoreQuerier::new(http.clone(), config.core_connection_uri())?;
    if let Some(api_key) = config.core_api_key() {
        querier = querier.with_api_key(SecretString::new(api_key));
    }

    let inputs = providers.into_iter().map(ProviderInput::new).collect();
    Ok(ThirdParty::new(inputs, Arc::new(querier), http)?)
}

fn load_providers(path: &Path) -> Result<Vec<ProviderConfig>, Box<dyn StdError>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read providers file {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&contents)?)
}
