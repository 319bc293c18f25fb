// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use theta_vault::{
    api::router,
    blockchain::HttpChainRpc,
    config::{LogFormat, VaultConfig},
    faucet::{CommandDisburser, FaucetBatchScheduler},
    state::AppState,
    storage::{RecordStore, RedbRecordStore},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = VaultConfig::from_env()?;
    init_tracing(config.log_format);
    for warning in config.warnings() {
        warn!("{warning}");
    }

    // Install the ring crypto provider for rustls before any TLS operations.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        error!("A rustls crypto provider was already installed");
    }

    let db_path = config.record_db_path();
    let store: Arc<dyn RecordStore> = Arc::new(RedbRecordStore::open(&db_path)?);

    let chain = Arc::new(HttpChainRpc::new(
        &config.chain.rpc_endpoint,
        config.chain.rpc_timeout,
    )?);
    info!(
        chain_id = %config.chain.chain_id,
        rpc = %config.chain.rpc_endpoint,
        "Node client configured"
    );

    let shutdown = CancellationToken::new();
    let faucet_handle = if config.faucet.enabled {
        let disburser = Arc::new(CommandDisburser::new(config.faucet.command.clone()));
        let faucet = FaucetBatchScheduler::new(&config.faucet, store.clone(), disburser);
        Some(tokio::spawn(faucet.run(shutdown.clone())))
    } else {
        info!("Faucet disabled");
        None
    };

    let app = router(AppState::new(store.clone(), chain, config.chain.clone()));
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let handle = Handle::new();
    let signal_handle = handle.clone();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        signal_shutdown.cancel();
        signal_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    match &config.server.tls {
        Some((cert, key)) => {
            let tls = RustlsConfig::from_pem_file(cert, key).await?;
            info!(%addr, "Theta vault listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!(%addr, "Theta vault listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    shutdown.cancel();
    if let Some(faucet) = faucet_handle {
        if let Err(e) = faucet.await {
            error!(error = %e, "Faucet task panicked");
        }
    }
    store.close();
    info!("Shutdown complete");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
