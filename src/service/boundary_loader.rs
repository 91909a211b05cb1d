use crate::error::AtlasError;
use crate::types::{Feature, MunicipalBoundary, StateBoundary};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{fs, path::Path};
use tracing::{info, warn};

/// Boundaries read from a seed directory.
#[derive(Debug, Default)]
pub struct LoadedBoundaries {
    pub states: Vec<StateBoundary>,
    pub municipalities: Vec<MunicipalBoundary>,
}

impl LoadedBoundaries {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.municipalities.is_empty()
    }
}

/// Load GeoJSON FeatureCollections from a directory. Files holding state
/// boundaries (properties carry `statefp`) and municipal boundaries may be
/// mixed freely.
pub fn load_from_dir(dir: &Path) -> Result<LoadedBoundaries, AtlasError> {
    let mut loaded = LoadedBoundaries::default();
    if !dir.exists() {
        info!(path = %dir.display(), "boundary seed directory not found; skipping load");
        return Ok(loaded);
    }

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                let err: AtlasError = e.into();
                warn!(error = %err, "failed to read boundary dir entry");
                None
            }
        })
        .filter(|path| is_geojson_file(path))
        .collect();
    paths.sort();

    for path in paths {
        match load_file(&path, &mut loaded) {
            Ok(count) => info!(path = %path.display(), count, "loaded boundary file"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to load boundary file"),
        }
    }
    Ok(loaded)
}

fn is_geojson_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("geojson") || ext.eq_ignore_ascii_case("json"))
        == Some(true)
}

/// Features are decoded one at a time; a bad feature is skipped with a
/// warning and the rest of the file still loads.
fn load_file(path: &Path, into: &mut LoadedBoundaries) -> Result<usize, AtlasError> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    let is_states = is_state_collection(&value);
    let features = match value {
        Value::Object(mut obj) => match obj.remove("features") {
            Some(Value::Array(features)) => features,
            _ => return Err(not_a_collection()),
        },
        _ => return Err(not_a_collection()),
    };
    if is_states {
        Ok(decode_features(path, features, &mut into.states))
    } else {
        Ok(decode_features(path, features, &mut into.municipalities))
    }
}

fn not_a_collection() -> AtlasError {
    AtlasError::InvalidRequest("not a GeoJSON FeatureCollection".to_string())
}

fn decode_features<P: DeserializeOwned>(
    path: &Path,
    features: Vec<Value>,
    into: &mut Vec<Feature<P>>,
) -> usize {
    let mut count = 0;
    for (index, raw) in features.into_iter().enumerate() {
        match serde_json::from_value::<Feature<P>>(raw) {
            Ok(feature) => {
                into.push(feature);
                count += 1;
            }
            Err(e) => warn!(
                path = %path.display(),
                index,
                error = %e,
                "skipping unreadable boundary feature"
            ),
        }
    }
    count
}

fn is_state_collection(value: &Value) -> bool {
    value
        .get("features")
        .and_then(Value::as_array)
        .and_then(|features| features.first())
        .and_then(|f| f.get("properties"))
        .is_some_and(|p| p.get("statefp").is_some() && p.get("municipal_name").is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();
        let mut dir = std::env::temp_dir();
        dir.push(format!("muniscope-{tag}-{}-{nanos}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_dir_is_empty() {
        let loaded = load_from_dir(Path::new("/definitely/not/here")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn loads_state_and_municipal_files_and_skips_bad_ones() {
        let dir = temp_dir("loader");
        fs::write(
            dir.join("states.geojson"),
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":null,
                 "properties":{"id":1,"statefp":"48","name":"Texas","stusps":"TX"}}]}"#,
        )
        .unwrap();
        fs::write(
            dir.join("tx_places.geojson"),
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":null,
                 "properties":{"id":10,"municipal_name":"Austin","state":"TX","fips_code":"4845305"}},
                {"type":"Feature","geometry":null,
                 "properties":{"id":11,"municipal_name":"Waco","state":"TX"}}]}"#,
        )
        .unwrap();
        fs::write(dir.join("broken.geojson"), "{ not json").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let loaded = load_from_dir(&dir).unwrap();
        assert_eq!(loaded.states.len(), 1);
        assert_eq!(loaded.states[0].properties.name, "Texas");
        assert_eq!(loaded.municipalities.len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn odd_features_do_not_empty_the_file() {
        let dir = temp_dir("lenient");
        fs::write(
            dir.join("places.geojson"),
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":null,
                 "properties":{"id":1,"municipal_name":"Houston","state":"TX",
                   "fips_code":"4835000","pop_1990":"1630553","pop_2010":2099451.0}},
                {"type":"Feature","geometry":null,
                 "properties":{"id":2,"municipal_name":null,"state":"TX"}},
                {"type":"Feature","geometry":null,"properties":{"municipal_name":"No Id"}},
                {"type":"Feature","geometry":null,
                 "properties":{"id":3,"municipal_name":"Dallas","state":"TX","pop_2020":1304379}}]}"#,
        )
        .unwrap();

        let loaded = load_from_dir(&dir).unwrap();
        assert_eq!(loaded.municipalities.len(), 3);
        let houston = &loaded.municipalities[0].properties;
        assert_eq!(houston.pop_1990, Some(1630553));
        assert_eq!(houston.pop_2010, Some(2099451));
        assert_eq!(loaded.municipalities[1].properties.municipal_name, "");
        assert_eq!(loaded.municipalities[2].properties.id, 3);

        let _ = fs::remove_dir_all(&dir);
    }
}
