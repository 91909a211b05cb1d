//! SQL DDL for the financial and geospatial stores (SQLite).

use crate::types::{Metric, MetricClass};

/// Financial store tables other than `municipal_finances`, whose columns come
/// from the metric schema (see [`municipal_finances_ddl`]).
/// - `municipalities.mid` is a hyphenated UUID
/// - (`state`, `name`, `county_fips`) is unique so seeding is idempotent
/// - `generated_images.sections_data` is JSON text
pub const SQLITE_FINANCE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS municipalities (
    mid TEXT PRIMARY KEY,
    state TEXT NOT NULL,
    name TEXT NOT NULL,
    county_fips TEXT NOT NULL,
    UNIQUE (state, name, county_fips)
);

CREATE INDEX IF NOT EXISTS idx_municipalities_state ON municipalities(state);

CREATE TABLE IF NOT EXISTS generated_images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    image_url TEXT NOT NULL,
    prompt TEXT NOT NULL,
    theme TEXT NOT NULL,
    sections_data TEXT NOT NULL,
    is_saved INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_generated_images_user ON generated_images(user_id);
"#;

/// Geospatial store. Geometry is GeoJSON text.
pub const SQLITE_GIS_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS state_boundaries (
    id INTEGER PRIMARY KEY,
    statefp TEXT NOT NULL,
    statens TEXT NULL,
    geoidfq TEXT NULL,
    geoid TEXT NULL,
    stusps TEXT NULL,
    name TEXT NOT NULL,
    lsad TEXT NULL,
    aland INTEGER NULL,
    awater INTEGER NULL,
    geometry TEXT NULL
);

CREATE TABLE IF NOT EXISTS municipal_boundaries (
    id INTEGER PRIMARY KEY,
    municipal_name TEXT NOT NULL,
    municipal_code TEXT NULL,
    municipal_type TEXT NULL,
    county_name TEXT NULL,
    state TEXT NOT NULL,
    gnis_id TEXT NULL,
    fips_code TEXT NULL,
    fips_name TEXT NULL,
    pop_1990 INTEGER NULL,
    pop_2000 INTEGER NULL,
    pop_2010 INTEGER NULL,
    pop_2020 INTEGER NULL,
    sq_mi REAL NULL,
    geometry TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_municipal_boundaries_state ON municipal_boundaries(state);
"#;

pub(crate) fn column_type(class: MetricClass) -> &'static str {
    match class {
        // Decimal text keeps the exact two decimal places.
        MetricClass::Decimal => "TEXT",
        MetricClass::Count => "INTEGER",
        MetricClass::Measure => "REAL",
    }
}

/// `municipal_finances` with one nullable column per metric and a composite
/// primary key enforcing one record per municipality and year.
pub fn municipal_finances_ddl() -> String {
    let metric_columns: String = Metric::ALL
        .iter()
        .map(|m| format!("    {} {} NULL,\n", m.name(), column_type(m.class())))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS municipal_finances (\n    \
         record_id TEXT NOT NULL UNIQUE,\n    \
         mid TEXT NOT NULL REFERENCES municipalities(mid),\n    \
         year INTEGER NOT NULL,\n\
         {metric_columns}    \
         component_units TEXT NULL,\n    \
         principal_employers TEXT NULL,\n    \
         modifier TEXT NOT NULL,\n    \
         created_at TEXT NOT NULL,\n    \
         PRIMARY KEY (mid, year)\n)"
    )
}

/// Split a DDL script into individual statements (sqlx runs one at a time).
pub(crate) fn statements(script: &str) -> impl Iterator<Item = &str> {
    script.split(';').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finances_ddl_has_a_column_per_metric() {
        let ddl = municipal_finances_ddl();
        for metric in Metric::ALL {
            assert!(ddl.contains(&format!("{} ", metric.name())), "{metric}");
        }
        assert!(ddl.contains("debt TEXT NULL"));
        assert!(ddl.contains("parks INTEGER NULL"));
        assert!(ddl.contains("street_miles TEXT NULL"));
        assert!(ddl.contains("sewer_repairs TEXT NULL"));
        assert!(ddl.contains("PRIMARY KEY (mid, year)"));
    }

    #[test]
    fn scripts_split_into_statements() {
        assert_eq!(statements(SQLITE_FINANCE_INIT).count(), 4);
        assert_eq!(statements(SQLITE_GIS_INIT).count(), 3);
    }
}
