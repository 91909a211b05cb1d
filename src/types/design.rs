use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One lane or strip of a street cross-section, left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub width: f64,
    pub material: String,
    #[serde(rename = "use")]
    pub usage: String,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DesignTemplate {
    pub id: i64,
    pub name: &'static str,
    pub description: &'static str,
}

pub const DESIGN_TEMPLATES: &[DesignTemplate] = &[
    DesignTemplate {
        id: 1,
        name: "Urban Core",
        description: "Dense downtown street with wide sidewalks and transit lanes",
    },
    DesignTemplate {
        id: 2,
        name: "Suburban Development",
        description: "Collector road with planting strips and protected bike lanes",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub id: i64,
    pub user_id: i64,
    pub image_url: String,
    pub prompt: String,
    pub theme: String,
    pub sections_data: Value,
    pub is_saved: bool,
    pub created_at: DateTime<Utc>,
}
