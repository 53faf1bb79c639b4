use callctl::application::InboundCallRouter;
use callctl::config::{Config, LoggingConfig, StoreBackend};
use callctl::domain::call::{CallRecordStore, SignalDispatcher};
use callctl::domain::clock::SystemClock;
use callctl::domain::transfer::TransferOrchestrator;
use callctl::infrastructure::persistence::InMemoryCallRecordStore;
use callctl::infrastructure::signaling::BroadcastSignalDispatcher;
use callctl::interface::api::{build_router, init_metrics, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "postgres")]
use callctl::infrastructure::persistence::{create_pool, run_migrations, PgCallRecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    init_tracing(&config.logging);
    info!("Starting callctl");
    debug!("Configuration loaded: {:?}", config);

    let prometheus_handle = init_metrics()?;

    let store = create_store(&config).await?;

    let dispatcher = Arc::new(BroadcastSignalDispatcher::default());
    spawn_signal_logger(&dispatcher);
    let dispatcher: Arc<dyn SignalDispatcher> = dispatcher;

    let orchestrator = Arc::new(TransferOrchestrator::new(
        store.clone(),
        dispatcher.clone(),
        Arc::new(SystemClock),
    ));
    spawn_reaper(&config, orchestrator.clone());

    let state = AppState {
        store,
        orchestrator,
        inbound: Arc::new(InboundCallRouter::new(dispatcher)),
        forwarding: config.forwarding.clone(),
    };
    let app = build_router(state, prometheus_handle);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Control API listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn create_store(config: &Config) -> anyhow::Result<Arc<dyn CallRecordStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory call record store");
            Ok(Arc::new(InMemoryCallRecordStore::new()))
        }
        #[cfg(feature = "postgres")]
        StoreBackend::Postgres => {
            info!("Initializing database connection...");
            let pool = create_pool(&config.database).await?;
            run_migrations(&pool).await?;
            info!("Call record store initialized");
            Ok(Arc::new(PgCallRecordStore::new(pool)))
        }
        #[cfg(not(feature = "postgres"))]
        StoreBackend::Postgres => {
            anyhow::bail!("postgres store requested but the postgres feature is disabled")
        }
    }
}

/// Log every dispatched signal until a transport adapter takes over delivery
fn spawn_signal_logger(dispatcher: &BroadcastSignalDispatcher) {
    let mut rx = dispatcher.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(signal) => info!("Signal: {:?}", signal),
                Err(RecvError::Lagged(skipped)) => warn!("Signal logger skipped {} signals", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Cancel attended transfers whose consultation ran past the timeout
fn spawn_reaper(config: &Config, orchestrator: Arc<TransferOrchestrator>) {
    if config.transfer.reap_interval_secs == 0 {
        info!("Abandoned transfer reaper disabled");
        return;
    }

    let period = Duration::from_secs(config.transfer.reap_interval_secs);
    let max_age = config.transfer.consult_timeout();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            orchestrator.cancel_abandoned(max_age).await;
        }
    });
}
