use axum::{Json, extract::State};
use serde::Deserialize;

use crate::error::AtlasError;
use crate::middleware::{ApiQuery, AuthUser};
use crate::router::AtlasState;
use crate::types::{AnnotatedProperties, FeatureCollection, StateProperties};

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    pub state: String,
}

/// All state boundaries as one FeatureCollection.
pub async fn state_boundaries_handler(
    State(state): State<AtlasState>,
    _user: AuthUser,
) -> Result<Json<FeatureCollection<StateProperties>>, AtlasError> {
    let features = state.gis.list_state_boundaries().await?;
    Ok(Json(FeatureCollection::new(features)))
}

/// Municipal boundaries of a state that match a known municipality, each
/// tagged with its `mid`. `state` may be a name, abbreviation or FIPS code.
pub async fn municipal_boundaries_handler(
    State(state): State<AtlasState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<StateQuery>,
) -> Result<Json<FeatureCollection<AnnotatedProperties>>, AtlasError> {
    let features = state.reconciler.reconcile_state(&query.state).await?;
    Ok(Json(FeatureCollection::new(features)))
}
