use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod store;
mod utils;
mod workflow;

#[cfg(test)]
mod testing;

use config::Config;
use db::init_store;

use crate::docs::ApiDoc;
use crate::store::PresenceStore;
use crate::utils::sender_cache::SenderCache;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

/// Senders inserted per cache batch during warmup.
const WARMUP_BATCH_SIZE: usize = 250;

/// Lifetime of tokens minted with `presence issue-token`.
const GATEWAY_TOKEN_TTL_SECS: usize = 365 * 24 * 3600;

#[get("/")]
async fn index() -> impl Responder {
    "presence workflow engine"
}

/// Daily rolling file log under `config.log_dir`. Keep the guard alive for the process lifetime.
fn init_tracing(config: &Config) -> WorkerGuard {
    let (writer, guard) =
        tracing_appender::non_blocking(rolling::daily(&config.log_dir, "presence.log"));

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .pretty()
        .init();

    guard
}

fn spawn_sender_warmup(senders: Data<SenderCache>, store: Arc<dyn PresenceStore>, days: u32) {
    actix_web::rt::spawn(async move {
        match senders
            .warmup(store.as_ref(), days, WARMUP_BATCH_SIZE, chrono::Utc::now())
            .await
        {
            Ok(count) => info!(count, days, "Sender cache warm"),
            Err(e) => error!(error = %e, "Failed to warmup sender cache"),
        }
    });
}

/// `presence issue-token <gateway> [tenant_id]` prints a signed gateway token and exits.
fn issue_token(config: &Config, mut args: impl Iterator<Item = String>) -> anyhow::Result<()> {
    let gateway = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: presence issue-token <gateway> [tenant_id]"))?;
    let tenant = args.next();
    let token = auth::jwt::generate_gateway_token(
        &gateway,
        tenant.as_deref(),
        &config.jwt_secret,
        GATEWAY_TOKEN_TTL_SECS,
    )?;
    println!("{token}");
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let mut args = std::env::args().skip(1);
    if let Some(command) = args.next() {
        return match command.as_str() {
            "issue-token" => issue_token(&config, args),
            other => anyhow::bail!("unknown command {other:?}"),
        };
    }

    let _log_guard = init_tracing(&config);

    info!(addr = %config.server_addr, backend = ?config.storage_backend, "Server starting...");

    let store = init_store(&config).await?;
    let senders = Data::new(SenderCache::new(config.sender_cache_ttl));
    spawn_sender_warmup(senders.clone(), store.clone(), config.sender_cache_warmup_days);

    let store: Data<dyn PresenceStore> = Data::from(store);
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(store.clone())
            .app_data(senders.clone())
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
