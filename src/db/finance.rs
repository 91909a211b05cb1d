use crate::db::SqlitePool;
use crate::db::schema::{SQLITE_FINANCE_INIT, municipal_finances_ddl, statements};
use crate::error::AtlasError;
use crate::types::{
    FinancialRecord, Metric, MetricClass, MetricValue, Metrics, Modifier, Municipality,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, info};
use uuid::Uuid;

static RECORD_COLUMNS: LazyLock<String> = LazyLock::new(|| {
    let mut cols = vec!["record_id", "mid", "year"];
    cols.extend(Metric::ALL.iter().map(|m| m.name()));
    cols.extend(["component_units", "principal_employers", "modifier", "created_at"]);
    cols.join(", ")
});

static INSERT_RECORD: LazyLock<String> = LazyLock::new(|| {
    let count = 3 + Metric::ALL.len() + 4;
    let placeholders = vec!["?"; count].join(", ");
    format!(
        "INSERT INTO municipal_finances ({}) VALUES ({placeholders})",
        RECORD_COLUMNS.as_str()
    )
});

/// Manual entry replaces whatever the year held, generated or not.
static UPSERT_RECORD: LazyLock<String> = LazyLock::new(|| {
    let updates = Metric::ALL
        .iter()
        .map(|m| m.name())
        .chain([
            "record_id",
            "component_units",
            "principal_employers",
            "modifier",
            "created_at",
        ])
        .map(|c| format!("{c}=excluded.{c}"))
        .collect::<Vec<_>>()
        .join(",\n    ");
    format!(
        "{} ON CONFLICT(mid, year) DO UPDATE SET\n    {updates}",
        INSERT_RECORD.as_str()
    )
});

/// Generated history never displaces an existing year.
static INSERT_GENERATED: LazyLock<String> = LazyLock::new(|| {
    format!(
        "{} ON CONFLICT(mid, year) DO NOTHING",
        INSERT_RECORD.as_str()
    )
});

static SELECT_RECORDS: LazyLock<String> = LazyLock::new(|| {
    format!(
        "SELECT {} FROM municipal_finances",
        RECORD_COLUMNS.as_str()
    )
});

/// Financial store: municipalities and their yearly records.
#[derive(Clone)]
pub struct FinanceStorage {
    pool: SqlitePool,
}

impl FinanceStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), AtlasError> {
        for stmt in statements(SQLITE_FINANCE_INIT) {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        sqlx::query(&municipal_finances_ddl())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Return the municipality with this state, name and county, creating it
    /// if it does not exist yet.
    pub async fn ensure_municipality(
        &self,
        name: &str,
        state: &str,
        county_fips: &str,
    ) -> Result<Municipality, AtlasError> {
        let candidate =
            Municipality::new(name.trim(), state.trim().to_uppercase(), county_fips.trim());
        let inserted = sqlx::query(
            r#"INSERT INTO municipalities (mid, state, name, county_fips)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(state, name, county_fips) DO NOTHING"#,
        )
        .bind(candidate.mid.to_string())
        .bind(candidate.state.as_str())
        .bind(candidate.name.as_str())
        .bind(candidate.county_fips.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        let row = sqlx::query(
            r#"SELECT mid, state, name, county_fips FROM municipalities
               WHERE state = ? AND name = ? AND county_fips = ?"#,
        )
        .bind(candidate.state.as_str())
        .bind(candidate.name.as_str())
        .bind(candidate.county_fips.as_str())
        .fetch_one(&self.pool)
        .await?;
        let municipality = Self::row_to_municipality(row)?;
        if inserted > 0 {
            info!(
                mid = %municipality.mid,
                name = %municipality.name,
                state = %municipality.state,
                "municipality created"
            );
        }
        Ok(municipality)
    }

    pub async fn list_municipalities(&self, state: &str) -> Result<Vec<Municipality>, AtlasError> {
        let rows = sqlx::query(
            r#"SELECT mid, state, name, county_fips FROM municipalities
               WHERE state = ? ORDER BY name, county_fips"#,
        )
        .bind(state.to_uppercase())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_municipality).collect()
    }

    pub async fn get_municipality(&self, mid: Uuid) -> Result<Option<Municipality>, AtlasError> {
        let row = sqlx::query("SELECT mid, state, name, county_fips FROM municipalities WHERE mid = ?")
            .bind(mid.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_municipality).transpose()
    }

    /// Municipalities of a state with this name, case-insensitively. More than
    /// one means the name exists in several counties.
    pub async fn find_municipalities(
        &self,
        state: &str,
        name: &str,
    ) -> Result<Vec<Municipality>, AtlasError> {
        let rows = sqlx::query(
            r#"SELECT mid, state, name, county_fips FROM municipalities
               WHERE state = ? AND name = ? COLLATE NOCASE ORDER BY county_fips"#,
        )
        .bind(state.to_uppercase())
        .bind(name.trim())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_municipality).collect()
    }

    /// Store a manually entered record, replacing the year if present.
    pub async fn upsert_record(&self, record: &FinancialRecord) -> Result<(), AtlasError> {
        bind_record(sqlx::query(UPSERT_RECORD.as_str()), record)
            .execute(&self.pool)
            .await?;
        debug!(mid = %record.mid, year = record.year, "financial record upserted");
        Ok(())
    }

    /// Insert generated records in one transaction, skipping years that
    /// already exist. Returns how many were inserted.
    pub async fn insert_generated(&self, records: &[FinancialRecord]) -> Result<u64, AtlasError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for record in records {
            inserted += bind_record(sqlx::query(INSERT_GENERATED.as_str()), record)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn get_record(
        &self,
        mid: Uuid,
        year: i32,
    ) -> Result<Option<FinancialRecord>, AtlasError> {
        let sql = format!("{} WHERE mid = ? AND year = ?", SELECT_RECORDS.as_str());
        let row = sqlx::query(&sql)
            .bind(mid.to_string())
            .bind(year)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_record).transpose()
    }

    pub async fn latest_record(&self, mid: Uuid) -> Result<Option<FinancialRecord>, AtlasError> {
        let sql = format!(
            "{} WHERE mid = ? ORDER BY year DESC LIMIT 1",
            SELECT_RECORDS.as_str()
        );
        let row = sqlx::query(&sql)
            .bind(mid.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_record).transpose()
    }

    /// All records of a municipality, most recent year first.
    pub async fn list_records(&self, mid: Uuid) -> Result<Vec<FinancialRecord>, AtlasError> {
        let sql = format!("{} WHERE mid = ? ORDER BY year DESC", SELECT_RECORDS.as_str());
        let rows = sqlx::query(&sql)
            .bind(mid.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Self::row_to_record).collect()
    }

    fn row_to_municipality(row: SqliteRow) -> Result<Municipality, AtlasError> {
        let mid: String = row.try_get("mid")?;
        Ok(Municipality {
            mid: parse_uuid(&mid)?,
            name: row.try_get("name")?,
            state: row.try_get("state")?,
            county_fips: row.try_get("county_fips")?,
        })
    }

    /// NULL metric columns are left out of the metric map.
    fn row_to_record(row: SqliteRow) -> Result<FinancialRecord, AtlasError> {
        let record_id: String = row.try_get("record_id")?;
        let mid: String = row.try_get("mid")?;
        let year: i32 = row.try_get("year")?;
        let modifier: String = row.try_get("modifier")?;
        let created_at: String = row.try_get("created_at")?;

        let mut metrics = Metrics::new();
        for &metric in Metric::ALL {
            let value = match metric.class() {
                MetricClass::Decimal => row
                    .try_get::<Option<String>, _>(metric.name())?
                    .map(|s| Decimal::from_str(&s).map_err(decode_err))
                    .transpose()?
                    .map(MetricValue::Decimal),
                MetricClass::Count => row
                    .try_get::<Option<i64>, _>(metric.name())?
                    .map(MetricValue::Count),
                MetricClass::Measure => row
                    .try_get::<Option<f64>, _>(metric.name())?
                    .map(MetricValue::Measure),
            };
            if let Some(value) = value {
                metrics.insert(metric, value);
            }
        }

        let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_at)
            .map_err(decode_err)?
            .with_timezone(&Utc);

        Ok(FinancialRecord {
            record_id: parse_uuid(&record_id)?,
            mid: parse_uuid(&mid)?,
            year,
            metrics,
            component_units: row.try_get("component_units")?,
            principal_employers: row.try_get("principal_employers")?,
            modifier: modifier.parse::<Modifier>().map_err(decode_err)?,
            created_at,
        })
    }
}

fn bind_record<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    record: &FinancialRecord,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let mut query = query
        .bind(record.record_id.to_string())
        .bind(record.mid.to_string())
        .bind(record.year);
    for &metric in Metric::ALL {
        query = match record.metrics.get(metric) {
            Some(MetricValue::Decimal(v)) => query.bind(v.to_string()),
            Some(MetricValue::Count(v)) => query.bind(v),
            Some(MetricValue::Measure(v)) => query.bind(v),
            None => query.bind(None::<String>),
        };
    }
    query
        .bind(record.component_units.clone())
        .bind(record.principal_employers.clone())
        .bind(record.modifier.as_str())
        .bind(record.created_at.to_rfc3339())
}

fn parse_uuid(s: &str) -> Result<Uuid, AtlasError> {
    Uuid::parse_str(s).map_err(|e| decode_err(e).into())
}

fn decode_err<E>(e: E) -> sqlx::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    sqlx::Error::Decode(e.into())
}
