use calrelay::config::Config;
use calrelay::db::Store;
use calrelay::service::importer::{self, ImportDocument};
use calrelay::service::notifier_cache::NotifierCache;
use calrelay::utils::logging::init_tracing;
use mimalloc::MiMalloc;
use std::{process::ExitCode, sync::Arc};
use tracing::{error, info};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&cfg.basic.loglevel);

    info!(
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        max_connections = cfg.basic.max_connections,
        import_file = ?cfg.basic.import_file,
        "Welcome to calrelay {}",
        env!("CARGO_PKG_VERSION")
    );

    let cache = Arc::new(NotifierCache::new(
        cfg.basic.notifier_cache_capacity,
        cfg.notifier_cache_ttl(),
    ));

    // A store that failed to reach the current schema must not serve anything.
    let store = match Store::open(&cfg.basic.database_url, cfg.store_options(), cache).await {
        Ok(store) => store,
        Err(err) => {
            error!(error = %err, "failed to open store");
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = cfg.basic.import_file.as_ref() {
        let document = match ImportDocument::from_toml_file(path) {
            Ok(document) => document,
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to read import file");
                return ExitCode::FAILURE;
            }
        };
        if let Err(err) = importer::import(&store, &document).await {
            error!(path = %path.display(), error = %err, "import failed");
            return ExitCode::FAILURE;
        }
    }

    match summarize(&store).await {
        Ok((profiles, notifiers)) => info!(profiles, notifiers, "Store is up to date"),
        Err(err) => {
            error!(error = %err, "failed to read store");
            return ExitCode::FAILURE;
        }
    }

    store.close().await;
    ExitCode::SUCCESS
}

async fn summarize(store: &Store) -> Result<(usize, usize), calrelay::StoreError> {
    let profiles = store.profiles().list_names(false).await?.len();
    let notifiers = store.notifiers().list_names().await?.len();
    Ok((profiles, notifiers))
}
