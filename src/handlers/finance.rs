use axum::{Json, extract::State};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::AtlasError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::router::AtlasState;
use crate::types::finance::FinancialRecordInput;
use crate::types::{FinancialRecord, Municipality, UsState};

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct FinanceLookupQuery {
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub years: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SampleDataRequest {
    pub name: String,
    pub state: String,
    pub county_fips: String,
    #[serde(default)]
    pub years: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub mid: Uuid,
    pub requested: u32,
    pub inserted: u64,
    pub years: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct SampleDataResponse {
    pub municipality: Municipality,
    pub inserted: u64,
}

pub async fn list_municipalities_handler(
    State(state): State<AtlasState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<StateQuery>,
) -> Result<Json<Vec<Municipality>>, AtlasError> {
    let us_state = UsState::resolve(&query.state)?;
    Ok(Json(state.finance.list_municipalities(us_state.abbr).await?))
}

/// One record looked up by municipality name; the latest year unless `year`
/// is given. A name shared by several counties must be addressed by `mid`.
pub async fn finances_by_name_handler(
    State(state): State<AtlasState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<FinanceLookupQuery>,
) -> Result<Json<FinancialRecord>, AtlasError> {
    let us_state = UsState::resolve(&query.state)?;
    let mut found = state
        .finance
        .find_municipalities(us_state.abbr, &query.name)
        .await?;
    let municipality = match found.len() {
        0 => {
            return Err(AtlasError::NotFound(format!(
                "municipality {:?} in {us_state}",
                query.name.trim()
            )));
        }
        1 => found.remove(0),
        count => {
            return Err(AtlasError::AmbiguousMunicipality {
                name: query.name.trim().to_string(),
                state: us_state.abbr.to_string(),
                count,
            });
        }
    };

    let record = match query.year {
        Some(year) => state.finance.get_record(municipality.mid, year).await?,
        None => state.finance.latest_record(municipality.mid).await?,
    };
    record
        .map(Json)
        .ok_or_else(|| no_records(&municipality.name, query.year))
}

pub async fn list_records_handler(
    State(state): State<AtlasState>,
    _user: AuthUser,
    ApiPath(mid): ApiPath<Uuid>,
) -> Result<Json<Vec<FinancialRecord>>, AtlasError> {
    let municipality = require_municipality(&state, mid).await?;
    Ok(Json(state.finance.list_records(municipality.mid).await?))
}

pub async fn get_record_handler(
    State(state): State<AtlasState>,
    _user: AuthUser,
    ApiPath((mid, year)): ApiPath<(Uuid, i32)>,
) -> Result<Json<FinancialRecord>, AtlasError> {
    let municipality = require_municipality(&state, mid).await?;
    state
        .finance
        .get_record(mid, year)
        .await?
        .map(Json)
        .ok_or_else(|| no_records(&municipality.name, Some(year)))
}

/// Manual entry. Every metric must be supplied; the year is replaced
/// wholesale and tagged `user`.
pub async fn put_record_handler(
    State(state): State<AtlasState>,
    user: AuthUser,
    ApiPath((mid, year)): ApiPath<(Uuid, i32)>,
    ApiJson(input): ApiJson<FinancialRecordInput>,
) -> Result<Json<FinancialRecord>, AtlasError> {
    require_municipality(&state, mid).await?;
    let record = input.into_record(mid, year)?;
    record
        .metrics
        .check_complete()
        .map_err(AtlasError::InvalidRecord)?;
    state.finance.upsert_record(&record).await?;
    info!(%mid, year, user_id = user.user_id(), "financial record entered");
    Ok(Json(record))
}

/// Extend a municipality's history backwards from its latest record.
/// Years already on file are left untouched.
pub async fn generate_history_handler(
    State(state): State<AtlasState>,
    _user: AuthUser,
    ApiPath(mid): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AtlasError> {
    let num_years = history_years(&state, query.years)?;
    let municipality = require_municipality(&state, mid).await?;
    let latest = state
        .finance
        .latest_record(mid)
        .await?
        .ok_or_else(|| no_records(&municipality.name, None))?;

    let start_year = latest.year.checked_sub(1).ok_or_else(|| {
        AtlasError::InvalidRequest(format!("cannot generate years before {}", latest.year))
    })?;
    let series = state.generator.generate(&latest, start_year, num_years)?;
    let inserted = state.finance.insert_generated(&series).await?;
    info!(
        %mid,
        requested = num_years,
        inserted,
        "synthetic history stored"
    );
    Ok(Json(HistoryResponse {
        mid,
        requested: num_years,
        inserted,
        years: series.iter().map(|r| r.year).collect(),
    }))
}

/// Create the municipality if needed, then seed the current year with the
/// sample snapshot and generate the years before it.
pub async fn init_sample_data_handler(
    State(state): State<AtlasState>,
    _user: AuthUser,
    ApiJson(req): ApiJson<SampleDataRequest>,
) -> Result<Json<SampleDataResponse>, AtlasError> {
    let us_state = UsState::resolve(&req.state)?;
    let county_fips = req.county_fips.trim();
    if county_fips.len() != 5 || !county_fips.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AtlasError::InvalidRequest(format!(
            "county_fips must be 5 digits, got {county_fips:?}"
        )));
    }
    if !county_fips.starts_with(us_state.fips) {
        return Err(AtlasError::InvalidRequest(format!(
            "county {county_fips} is not in {us_state}"
        )));
    }
    if req.name.trim().is_empty() {
        return Err(AtlasError::InvalidRequest("name must not be empty".into()));
    }
    let num_years = history_years(&state, req.years)?;

    let municipality = state
        .finance
        .ensure_municipality(&req.name, us_state.abbr, county_fips)
        .await?;
    let year = Utc::now().year();
    let baseline = FinancialRecord::sample(municipality.mid, year);
    let history = state.generator.generate(&baseline, year - 1, num_years)?;

    let mut records = Vec::with_capacity(history.len() + 1);
    records.push(baseline);
    records.extend(history);
    let inserted = state.finance.insert_generated(&records).await?;
    info!(mid = %municipality.mid, inserted, "sample data initialized");

    Ok(Json(SampleDataResponse {
        municipality,
        inserted,
    }))
}

fn history_years(state: &AtlasState, requested: Option<u32>) -> Result<u32, AtlasError> {
    let years = requested.unwrap_or(state.history_years);
    if years == 0 || years > state.max_history_years {
        return Err(AtlasError::InvalidRequest(format!(
            "years must be between 1 and {}",
            state.max_history_years
        )));
    }
    Ok(years)
}

async fn require_municipality(state: &AtlasState, mid: Uuid) -> Result<Municipality, AtlasError> {
    state
        .finance
        .get_municipality(mid)
        .await?
        .ok_or_else(|| AtlasError::NotFound(format!("municipality {mid}")))
}

fn no_records(name: &str, year: Option<i32>) -> AtlasError {
    match year {
        Some(year) => AtlasError::NotFound(format!("{year} financial record for {name}")),
        None => AtlasError::NotFound(format!("financial records for {name}")),
    }
}
