use crate::db::SqlitePool;
use crate::db::schema::{SQLITE_GIS_INIT, statements};
use crate::error::AtlasError;
use crate::types::{
    Feature, MunicipalBoundary, MunicipalProperties, StateBoundary, StateProperties,
};
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

const MUNICIPAL_COLUMNS: &str = "id, municipal_name, municipal_code, municipal_type, county_name, \
     state, gnis_id, fips_code, fips_name, pop_1990, pop_2000, pop_2010, pop_2020, sq_mi, geometry";

const STATE_COLUMNS: &str =
    "id, statefp, statens, geoidfq, geoid, stusps, name, lsad, aland, awater, geometry";

/// Geospatial store: read side for reconciliation plus the import path used
/// by the seed loader.
#[derive(Clone)]
pub struct BoundaryStorage {
    pool: SqlitePool,
}

impl BoundaryStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn init_schema(&self) -> Result<(), AtlasError> {
        for stmt in statements(SQLITE_GIS_INIT) {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Insert or replace municipal boundaries by id in one transaction.
    pub async fn insert_municipal_boundaries(
        &self,
        boundaries: &[MunicipalBoundary],
    ) -> Result<usize, AtlasError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT OR REPLACE INTO municipal_boundaries ({MUNICIPAL_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        for b in boundaries {
            let p = &b.properties;
            sqlx::query(&sql)
                .bind(p.id)
                .bind(p.municipal_name.as_str())
                .bind(p.municipal_code.as_deref())
                .bind(p.municipal_type.as_deref())
                .bind(p.county_name.as_deref())
                .bind(p.state.trim().to_uppercase())
                .bind(p.gnis_id.as_deref())
                .bind(p.fips_code.as_deref())
                .bind(p.fips_name.as_deref())
                .bind(p.pop_1990)
                .bind(p.pop_2000)
                .bind(p.pop_2010)
                .bind(p.pop_2020)
                .bind(p.sq_mi)
                .bind(geometry_text(&b.geometry)?)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(boundaries.len())
    }

    pub async fn insert_state_boundaries(
        &self,
        boundaries: &[StateBoundary],
    ) -> Result<usize, AtlasError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT OR REPLACE INTO state_boundaries ({STATE_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        for b in boundaries {
            let p = &b.properties;
            sqlx::query(&sql)
                .bind(p.id)
                .bind(p.statefp.as_str())
                .bind(p.statens.as_deref())
                .bind(p.geoidfq.as_deref())
                .bind(p.geoid.as_deref())
                .bind(p.stusps.as_deref())
                .bind(p.name.as_str())
                .bind(p.lsad.as_deref())
                .bind(p.aland)
                .bind(p.awater)
                .bind(geometry_text(&b.geometry)?)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(boundaries.len())
    }

    /// Municipal boundaries of one state (2-letter code), ordered by id.
    pub async fn list_municipal_boundaries(
        &self,
        state: &str,
    ) -> Result<Vec<MunicipalBoundary>, AtlasError> {
        let sql = format!(
            "SELECT {MUNICIPAL_COLUMNS} FROM municipal_boundaries WHERE state = ? ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(state.to_uppercase())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_municipal).collect()
    }

    pub async fn list_state_boundaries(&self) -> Result<Vec<StateBoundary>, AtlasError> {
        let sql = format!("SELECT {STATE_COLUMNS} FROM state_boundaries ORDER BY id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_state).collect()
    }

    fn row_to_municipal(row: SqliteRow) -> Result<MunicipalBoundary, AtlasError> {
        let geometry: Option<String> = row.try_get("geometry")?;
        Ok(Feature {
            geometry: parse_geometry(geometry)?,
            properties: MunicipalProperties {
                id: row.try_get("id")?,
                municipal_name: row.try_get("municipal_name")?,
                municipal_code: row.try_get("municipal_code")?,
                municipal_type: row.try_get("municipal_type")?,
                county_name: row.try_get("county_name")?,
                state: row.try_get("state")?,
                gnis_id: row.try_get("gnis_id")?,
                fips_code: row.try_get("fips_code")?,
                fips_name: row.try_get("fips_name")?,
                pop_1990: row.try_get("pop_1990")?,
                pop_2000: row.try_get("pop_2000")?,
                pop_2010: row.try_get("pop_2010")?,
                pop_2020: row.try_get("pop_2020")?,
                sq_mi: row.try_get("sq_mi")?,
            },
        })
    }

    fn row_to_state(row: SqliteRow) -> Result<StateBoundary, AtlasError> {
        let geometry: Option<String> = row.try_get("geometry")?;
        Ok(Feature {
            geometry: parse_geometry(geometry)?,
            properties: StateProperties {
                id: row.try_get("id")?,
                statefp: row.try_get("statefp")?,
                statens: row.try_get("statens")?,
                geoidfq: row.try_get("geoidfq")?,
                geoid: row.try_get("geoid")?,
                stusps: row.try_get("stusps")?,
                name: row.try_get("name")?,
                lsad: row.try_get("lsad")?,
                aland: row.try_get("aland")?,
                awater: row.try_get("awater")?,
            },
        })
    }
}

fn geometry_text(geometry: &Value) -> Result<Option<String>, AtlasError> {
    if geometry.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(geometry)?))
}

fn parse_geometry(text: Option<String>) -> Result<Value, AtlasError> {
    match text {
        Some(s) => Ok(serde_json::from_str(&s)?),
        None => Ok(Value::Null),
    }
}
