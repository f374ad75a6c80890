use std::{sync::Arc, time::Duration};

use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::{
    api::{AppState, setup_routes},
    config::ServerConfig,
    error::Result,
    store::CommitmentStore,
};

/// Periodically closes objectives whose resolution date has passed.
pub fn spawn_deadline_sweeper(store: Arc<CommitmentStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;

            let store = Arc::clone(&store);
            match tokio::task::spawn_blocking(move || store.close_expired(Utc::now())).await {
                Ok(Ok(closed)) if !closed.is_empty() => {
                    info!(count = closed.len(), objectives = ?closed, "closed expired objectives")
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!(error = %e, "deadline sweep failed"),
                Err(e) => error!(error = %e, "deadline sweep task aborted"),
            }
        }
    })
}

pub async fn run(config: ServerConfig, store: Arc<CommitmentStore>) -> Result<()> {
    let sweeper = spawn_deadline_sweeper(
        Arc::clone(&store),
        Duration::from_secs(config.deadline_sweep_secs),
    );

    let state = web::Data::new(AppState {
        store: Arc::clone(&store),
        limits: config.limits.clone(),
        recently_published_limit: config.recently_published_limit,
    });

    let bind_addr = config.bind_address();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(setup_routes)
    })
    .bind(&bind_addr)?;

    info!(address = %bind_addr, "ac2-server listening");
    server.run().await?;

    sweeper.abort();
    store.flush()?;
    Ok(())
}
