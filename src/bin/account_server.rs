use std::path::PathBuf;
use std::sync::Arc;

use account_policy::web::{self, AppState};
use account_policy::{
    logging, AccessPolicy, AccountService, Argon2Hasher, MemoryStore, Settings, TokenService,
};
use actix_web::{middleware, App, HttpServer};
use anyhow::{Context, Result};
use chrono::Duration;
use clap::Parser;
use tracing::info;

/// Command line options for the account server.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// TOML settings file; `ACCOUNTS__*` environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the settings file
    #[arg(long)]
    port: Option<u16>,
}

fn seconds(value: u64, name: &str) -> Result<Duration> {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_seconds)
        .with_context(|| format!("{} is out of range", name))
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    logging::init(&settings.server.log_level).context("installing tracing subscriber")?;

    let hasher = Arc::new(Argon2Hasher::new(settings.hashing).context("building password hasher")?);
    let store = Arc::new(MemoryStore::new());
    let accounts = AccountService::new(store, hasher, AccessPolicy::new(settings.policy.clone()))
        .context("preparing account service")?;

    if let Some(account) = &settings.bootstrap {
        accounts
            .ensure_staff(
                &account.username,
                account.password.expose_secret(),
                &account.email,
            )
            .context("creating bootstrap staff account")?;
    }

    let tokens = TokenService::new(
        settings.token.secret.expose_secret().as_bytes(),
        seconds(settings.token.expiration_secs, "token.expiration_secs")?,
        seconds(settings.token.refresh_window_secs, "token.refresh_window_secs")?,
    );
    let state = actix_web::web::Data::new(AppState::new(accounts, tokens));

    let port = cli.port.unwrap_or(settings.server.port);
    info!(
        host = %settings.server.host,
        port,
        self_registration = settings.policy.self_registration,
        "starting account server"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(web::configure)
    })
    .bind((settings.server.host.as_str(), port))
    .with_context(|| format!("binding {}:{}", settings.server.host, port))?
    .run()
    .await
    .context("running HTTP server")
}
