use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// GeoJSON feature. Geometry is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature<P> {
    pub geometry: Value,
    pub properties: P,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection<P> {
    pub features: Vec<Feature<P>>,
}

impl<P> FeatureCollection<P> {
    pub fn new(features: Vec<Feature<P>>) -> Self {
        Self { features }
    }
}

/// Attributes of a municipal boundary polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalProperties {
    pub id: i64,
    /// Empty when the export carries no name; such features never match.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub municipal_name: String,
    #[serde(default)]
    pub municipal_code: Option<String>,
    #[serde(default)]
    pub municipal_type: Option<String>,
    #[serde(default)]
    pub county_name: Option<String>,
    pub state: String,
    #[serde(default)]
    pub gnis_id: Option<String>,
    /// Place FIPS code; its first five digits are the county FIPS code.
    #[serde(default)]
    pub fips_code: Option<String>,
    #[serde(default)]
    pub fips_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub pop_1990: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub pop_2000: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub pop_2010: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub pop_2020: Option<i64>,
    #[serde(default, deserialize_with = "lenient_float")]
    pub sq_mi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateProperties {
    pub id: i64,
    pub statefp: String,
    #[serde(default)]
    pub statens: Option<String>,
    #[serde(default)]
    pub geoidfq: Option<String>,
    #[serde(default)]
    pub geoid: Option<String>,
    #[serde(default)]
    pub stusps: Option<String>,
    pub name: String,
    #[serde(default)]
    pub lsad: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub aland: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub awater: Option<i64>,
}

/// Municipal boundary properties tagged with the matching municipality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedProperties {
    pub mid: Uuid,
    #[serde(flatten)]
    pub boundary: MunicipalProperties,
}

pub type MunicipalBoundary = Feature<MunicipalProperties>;
pub type StateBoundary = Feature<StateProperties>;
pub type AnnotatedBoundaryFeature = Feature<AnnotatedProperties>;

/// Exports disagree on numeric types: counts arrive as integers, floats
/// (`961855.0`) or strings (`"465622"`). Anything unreadable becomes `None`.
fn as_finite_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn lenient_float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(as_finite_f64))
}

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let Some(value) = Option::<Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let exact = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(exact.or_else(|| {
        as_finite_f64(&value)
            .filter(|v| v.abs() < i64::MAX as f64)
            .map(|v| v.round() as i64)
    }))
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
