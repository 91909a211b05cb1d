//! Database module: SQLite-backed stores.
//!
//! Layout:
//! - `schema.rs`: SQL DDL for both databases
//! - `finance.rs`: municipalities and yearly financial records
//! - `gis.rs`: state and municipal boundary polygons
//! - `design.rs`: generated cross-section images

pub mod design;
pub mod finance;
pub mod gis;
pub mod schema;

pub use design::ImageStorage;
pub use finance::FinanceStorage;
pub use gis::BoundaryStorage;

use crate::error::AtlasError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

pub type SqlitePool = Pool<Sqlite>;

/// Open (creating if missing) a SQLite database.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AtlasError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
    Ok(pool)
}

/// Both stores, connected and with their schemas in place.
#[derive(Clone)]
pub struct Stores {
    pub finance: FinanceStorage,
    pub gis: BoundaryStorage,
    pub images: ImageStorage,
}

impl Stores {
    pub async fn open(database_url: &str, gis_database_url: &str) -> Result<Self, AtlasError> {
        let finance_pool = connect(database_url).await?;
        let gis_pool = if gis_database_url == database_url {
            finance_pool.clone()
        } else {
            connect(gis_database_url).await?
        };

        let finance = FinanceStorage::new(finance_pool.clone());
        finance.init_schema().await?;
        let gis = BoundaryStorage::new(gis_pool);
        gis.init_schema().await?;

        Ok(Self {
            finance,
            gis,
            images: ImageStorage::new(finance_pool),
        })
    }
}
