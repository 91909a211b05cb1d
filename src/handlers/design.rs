use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::AtlasError;
use crate::middleware::{ApiPath, ApiQuery, AuthUser};
use crate::router::AtlasState;
use crate::service::prompt::build_prompt;
use crate::types::design::{DESIGN_TEMPLATES, GeneratedImage, Section};

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    #[serde(default = "default_units")]
    pub units: String,
    pub theme: String,
    /// JSON array of sections, left to right.
    pub sections: String,
}

fn default_units() -> String {
    "feet".to_string()
}

pub async fn templates_handler(_user: AuthUser) -> Json<Value> {
    Json(json!({ "templates": DESIGN_TEMPLATES }))
}

/// Build a prompt from the sections, render it, and record the image for
/// the caller.
pub async fn generate_handler(
    State(state): State<AtlasState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<GenerateQuery>,
) -> Result<Json<GeneratedImage>, AtlasError> {
    let sections: Vec<Section> = serde_json::from_str(&query.sections)
        .map_err(|e| AtlasError::InvalidRequest(format!("sections: {e}")))?;
    if sections.is_empty() {
        return Err(AtlasError::InvalidRequest("at least one section is required".into()));
    }
    let prompt = build_prompt(&query.units, &sections, &query.theme);
    let image_url = state.image_client.generate(&prompt, &query.theme).await?;

    let sections_data = serde_json::to_value(&sections)?;
    let image = state
        .images
        .insert(user.user_id(), &image_url, &prompt, &query.theme, &sections_data)
        .await?;
    info!(id = image.id, user_id = image.user_id, "cross-section image recorded");
    Ok(Json(image))
}

pub async fn list_images_handler(
    State(state): State<AtlasState>,
    user: AuthUser,
) -> Result<Json<Vec<GeneratedImage>>, AtlasError> {
    Ok(Json(state.images.list_for_user(user.user_id()).await?))
}

pub async fn save_handler(
    State(state): State<AtlasState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AtlasError> {
    if !state.images.mark_saved(user.user_id(), id).await? {
        return Err(AtlasError::NotFound(format!("image {id}")));
    }
    Ok(Json(json!({ "success": true, "id": id })))
}
