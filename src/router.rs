use axum::{
    Json, Router,
    routing::{get, post},
};
use jsonwebtoken::DecodingKey;
use serde_json::{Value, json};

use crate::api::ImageClient;
use crate::config::Config;
use crate::db::{BoundaryStorage, FinanceStorage, ImageStorage, Stores};
use crate::error::AtlasError;
use crate::handlers::{design, finance, gis};
use crate::service::{HistoryGenerator, Reconciler};

/// Shared handler state: store handles plus immutable settings.
#[derive(Clone)]
pub struct AtlasState {
    pub finance: FinanceStorage,
    pub gis: BoundaryStorage,
    pub images: ImageStorage,
    pub reconciler: Reconciler,
    pub image_client: ImageClient,
    pub generator: HistoryGenerator,
    pub decoding_key: DecodingKey,
    pub history_years: u32,
    pub max_history_years: u32,
}

impl AtlasState {
    pub fn new(stores: Stores, cfg: &Config) -> Result<Self, AtlasError> {
        Ok(Self {
            reconciler: Reconciler::new(stores.finance.clone(), stores.gis.clone()),
            finance: stores.finance,
            gis: stores.gis,
            images: stores.images,
            image_client: ImageClient::new(cfg)?,
            generator: HistoryGenerator::default(),
            decoding_key: DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            history_years: cfg.history_years,
            max_history_years: cfg.max_history_years,
        })
    }
}

pub fn atlas_router(state: AtlasState) -> Router {
    let financial = Router::new()
        .route("/gis/states", get(gis::state_boundaries_handler))
        .route("/gis/municipalities", get(gis::municipal_boundaries_handler))
        .route("/municipalities", get(finance::list_municipalities_handler))
        .route(
            "/municipality/finances",
            get(finance::finances_by_name_handler),
        )
        .route(
            "/municipalities/{mid}/finances",
            get(finance::list_records_handler),
        )
        .route(
            "/municipalities/{mid}/finances/{year}",
            get(finance::get_record_handler).put(finance::put_record_handler),
        )
        .route(
            "/municipalities/{mid}/history",
            post(finance::generate_history_handler),
        )
        .route("/init-sample-data", post(finance::init_sample_data_handler));

    let designer = Router::new()
        .route("/templates", get(design::templates_handler))
        .route("/cross-section/generate", get(design::generate_handler))
        .route("/cross-section/{id}/save", post(design::save_handler))
        .route("/images", get(design::list_images_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/financial", financial)
        .nest("/design", designer)
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
