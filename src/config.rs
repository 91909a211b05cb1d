use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Runtime configuration. Defaults below, overridden by `MUNISCOPE_*`
/// environment variables (a `.env` file is loaded first by `main`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub loglevel: String,
    /// Financial store: municipalities and yearly records.
    pub database_url: String,
    /// Geospatial store: state and municipal boundaries.
    pub gis_database_url: String,
    /// HS256 secret shared with the token issuer.
    pub jwt_secret: String,
    /// Directory of `*.geojson` files imported into the geospatial store at startup.
    pub boundary_seed_dir: Option<PathBuf>,
    pub image_service_url: Option<Url>,
    pub image_service_key: Option<String>,
    pub proxy: Option<Url>,
    /// Default length of a generated history.
    pub history_years: u32,
    pub max_history_years: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            database_url: "sqlite:data/finance.sqlite".to_string(),
            gis_database_url: "sqlite:data/gis.sqlite".to_string(),
            jwt_secret: "change-me".to_string(),
            boundary_seed_dir: None,
            image_service_url: None,
            image_service_key: None,
            proxy: None,
            history_years: 10,
            max_history_years: 50,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed("MUNISCOPE_"))
    }
}
