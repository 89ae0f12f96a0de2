use std::net::SocketAddr;
use std::sync::Arc;

use seatline_api::{app, AppState};
use seatline_core::codes::RandomCodeGenerator;
use seatline_core::notifier::{ConsoleNotifier, Notifier};
use seatline_core::repository::ReservationStore;
use seatline_saga::{Collaborators, InMemoryReservationStore, SagaServices, SagaTimeouts};
use seatline_store::app_config::Config;
use seatline_store::{DbClient, HttpDirectoryClient, HttpNotifier, HttpWorkflowEngine, PgReservationStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatline_api=debug,seatline_saga=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting Seatline API on port {}", config.server.port);

    let (store, store_backend): (Arc<dyn ReservationStore>, &'static str) = match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections).await?;
            db.migrate().await?;
            (Arc::new(PgReservationStore::new(db.pool)), "postgres")
        }
        None => {
            tracing::warn!("database.url not set, reservations are kept in memory only");
            (Arc::new(InMemoryReservationStore::new()), "memory")
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.notifier.endpoint {
        Some(endpoint) => Arc::new(HttpNotifier::new(
            endpoint.clone(),
            config.notifier.sender.clone(),
            config.notifier.region.clone(),
        )),
        None => Arc::new(ConsoleNotifier::new(
            config.notifier.sender.clone(),
            config.notifier.region.clone(),
        )),
    };

    let deps = Collaborators {
        store,
        directory: Arc::new(HttpDirectoryClient::new(&config.directory.base_url)?),
        workflow: Arc::new(HttpWorkflowEngine::new(&config.workflow.gateway_address)),
        notifier,
        codes: Arc::new(RandomCodeGenerator),
        process_id: config.workflow.process_id.clone(),
        timeouts: SagaTimeouts {
            store: config.timeouts.store(),
            directory: config.timeouts.directory(),
            workflow: config.timeouts.workflow(),
            notifier: config.timeouts.notifier(),
        },
    };
    tracing::info!(
        directory = %config.directory.base_url,
        gateway = %config.workflow.gateway_address,
        process_id = %config.workflow.process_id,
        "Collaborators configured"
    );

    let app = app(AppState::new(SagaServices::new(deps), store_backend));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
