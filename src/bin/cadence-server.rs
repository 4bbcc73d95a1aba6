// ABOUTME: Server binary for the Cadence scheduling engine
// ABOUTME: Wires configuration, storage, services, and the HTTP router together
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Cadence Server Binary
//!
//! Starts the scheduling engine's HTTP surface with delegated OAuth,
//! free/busy aggregation, and plan persistence.

use anyhow::Result;
use cadence::auth::AuthManager;
use cadence::calendar::CalendarClient;
use cadence::config::ServerConfig;
use cadence::database::Database;
use cadence::logging;
use cadence::oauth::OAuthGateway;
use cadence::planning::PlanningClient;
use cadence::routes::{self, ServerResources};
use cadence::schedule::SchedulingService;
use cadence::service_auth::{ServiceAssertionSigner, ServiceCredential};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cadence-server")]
#[command(about = "Cadence - calendar-aware task scheduling engine")]
struct Args {
    /// Override the HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    info!("starting cadence server: {}", config.summary());

    let database = Arc::new(Database::new(&config.database_url).await?);

    let auth = AuthManager::new(config.jwt_secret.clone().into_bytes());
    let gateway = Arc::new(OAuthGateway::new(config.oauth.clone(), Arc::clone(&database))?);
    let calendar = Arc::new(CalendarClient::new()?);
    let scheduler = SchedulingService::new(
        Arc::clone(&gateway),
        Arc::clone(&calendar),
        Arc::clone(&database),
    );

    // The service credential is loaded once per process; without it the
    // /plan endpoint still works for explicit plans, only prompt drafting
    // is unavailable.
    let planner = match &config.service_credential_path {
        Some(path) => {
            let credential = ServiceCredential::from_file(path)?;
            let signer = ServiceAssertionSigner::new(credential)?;
            Some(PlanningClient::new(config.planning.clone(), signer)?)
        }
        None => {
            warn!("SERVICE_CREDENTIAL_PATH not set; plan drafting disabled");
            None
        }
    };

    let resources = Arc::new(ServerResources {
        database,
        auth,
        gateway,
        calendar,
        scheduler,
        planner,
    });

    let app = routes::router(resources);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port)).await?;
    info!("listening on port {}", config.http_port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
