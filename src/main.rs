use mimalloc::MiMalloc;
use muniscope::config::Config;
use muniscope::db::Stores;
use muniscope::router::{AtlasState, atlas_router};
use muniscope::service::boundary_loader;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.listen_addr,
        database_url = %cfg.database_url,
        gis_database_url = %cfg.gis_database_url,
        image_service = %cfg.image_service_url.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.loglevel,
    );
    if cfg.jwt_secret == Config::default().jwt_secret {
        warn!("jwt_secret is the built-in default; set MUNISCOPE_JWT_SECRET");
    }

    let stores = Stores::open(&cfg.database_url, &cfg.gis_database_url).await?;

    if let Some(seed_dir) = cfg.boundary_seed_dir.as_ref() {
        match boundary_loader::load_from_dir(seed_dir) {
            Ok(loaded) if !loaded.is_empty() => {
                let states = stores.gis.insert_state_boundaries(&loaded.states).await?;
                let municipal = stores
                    .gis
                    .insert_municipal_boundaries(&loaded.municipalities)
                    .await?;
                info!(
                    path = %seed_dir.display(),
                    states,
                    municipal,
                    "boundaries imported from filesystem"
                );
            }
            Ok(_) => {
                info!(path = %seed_dir.display(), "no boundary files discovered");
            }
            Err(e) => {
                warn!(
                    path = %seed_dir.display(),
                    error = %e,
                    "failed to load boundaries from directory"
                );
            }
        }
    }

    let state = AtlasState::new(stores, &cfg)?;
    let app = atlas_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
