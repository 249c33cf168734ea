use std::time::Duration;

use clap::Parser;
use tokio::time;
use warden_tokens::{gateway::HttpGateway, ClientId, ClientSecret, TokenManager, TokenStatus};

#[derive(Debug, Parser)]
struct Opts {
    /// The platform's base URL; tokens are requested from `{base_url}/oauth2/token`
    #[arg(short, long, env)]
    base_url: String,

    /// The client ID of the application
    #[arg(short, long, env)]
    client_id: ClientId,

    /// The client secret used to identify the application to the platform
    #[arg(short = 's', long, env, hide_env_values = true)]
    client_secret: ClientSecret,

    /// The account to authenticate as
    #[arg(short, long, env)]
    username: String,

    /// The account's password
    #[arg(short, long, env, hide_env_values = true)]
    password: String,

    /// Seconds between token pulls
    #[arg(short, long, env, default_value_t = 5)]
    interval: u64,

    /// Seconds a token request may take before it is abandoned
    #[arg(short, long, env, default_value_t = 10)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let client = reqwest::Client::builder().https_only(true).build()?;
    let gateway = HttpGateway::new(client).request_timeout(Duration::from_secs(opts.timeout));
    let manager = TokenManager::new(gateway);

    manager
        .configure(opts.client_id, opts.client_secret, opts.base_url)
        .await;
    manager.authenticate(&opts.username, &opts.password).await?;

    tracing::info!(
        subject = %manager.get_subject_id()?,
        next_refresh = manager.next_scheduled_refresh().await.map(|t| t.0),
        "authenticated"
    );

    let mut watcher = manager.watch();
    tokio::spawn(async move {
        while watcher.changed().await.is_ok() {
            let status = watcher.status();
            tracing::info!(?status, "session changed");
        }
    });

    let mut interval = time::interval(Duration::from_secs(opts.interval));
    loop {
        interval.tick().await;

        let token = match manager.get_valid_token().await {
            Ok(token) => token,
            Err(error) if error.requires_authentication() => {
                tracing::warn!(%error, "tokens lost, authenticating again");
                manager.authenticate(&opts.username, &opts.password).await?;
                continue;
            }
            Err(error) => {
                let transient = error.gateway_error().map_or(false, |e| e.is_transient());
                tracing::error!(%error, transient, "unable to get a token");
                continue;
            }
        };

        let session = manager.session();
        let Some(state) = session.token() else {
            continue;
        };

        let status = state.token_status();
        match status {
            TokenStatus::Fresh => tracing::debug!(
                ?status,
                token = format_args!("{:#?}", token),
                stale = state.stale().0,
                expiry = state.expiry().0,
                "pulled token"
            ),
            TokenStatus::Stale => tracing::warn!(
                ?status,
                stale = state.stale().0,
                expiry = state.expiry().0,
                "pulled token"
            ),
            TokenStatus::Expired => tracing::error!(
                ?status,
                stale = state.stale().0,
                expiry = state.expiry().0,
                "pulled token"
            ),
        }
    }
}
