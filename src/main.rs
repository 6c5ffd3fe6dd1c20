use dotenvy::dotenv;
use leave_ledger::{
    config::{self, database},
    core::absence_type::seed_absence_types,
    errors::Result,
    events::{EventSubscriber, JsonLinesFeed, SigningReconciler},
};
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let database_url = database::resolve_database_url(app_config.database_url.as_deref());
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed configured absence types
    seed_absence_types(&db, &app_config.absence_types)
        .await
        .inspect_err(|e| error!("Failed to seed absence types: {}", e))?;

    // 6. Run the signing event listener over stdin
    let events = app_config.events;
    if !events.enabled {
        info!("Event subscriber is disabled");
        return Ok(());
    }

    let channels = events.channels();
    info!("Starting event subscriber for channels: {:?}", channels);
    let feed = JsonLinesFeed::new(BufReader::new(tokio::io::stdin()), channels);
    let subscriber = EventSubscriber::new(SigningReconciler::new(db), &events);
    let handle = subscriber.start(feed);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        }
        () = handle.closed() => {
            info!("Event feed reached end of input");
        }
    }
    handle.stop(events.shutdown_timeout()).await;

    Ok(())
}
